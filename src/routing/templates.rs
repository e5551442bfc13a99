use std::path::Path;

const SECURITY_HEADERS: &str = "    add_header X-Frame-Options \"SAMEORIGIN\" always;
    add_header X-Content-Type-Options \"nosniff\" always;
    add_header X-XSS-Protection \"1; mode=block\" always;
";

/// Server block serving a directory, with SPA fallback to `/index.html`
pub fn static_unit(hostname: &str, root: &Path) -> String {
    format!(
        r#"server {{
    listen 80;
    server_name {hostname};

    root {root};
    index index.html index.htm;

    location / {{
        try_files $uri $uri/ /index.html;
    }}

{headers}
    gzip on;
    gzip_vary on;
    gzip_types text/plain text/css text/xml text/javascript application/x-javascript application/xml+rss application/json;

    location ~* \.(jpg|jpeg|png|gif|ico|css|js|svg|woff|woff2|ttf|eot)$ {{
        expires 1y;
        add_header Cache-Control "public, immutable";
    }}
}}
"#,
        hostname = hostname,
        root = root.display(),
        headers = SECURITY_HEADERS,
    )
}

/// Server block proxying to a local port, with websocket upgrade forwarding
pub fn proxy_unit(hostname: &str, port: u16) -> String {
    format!(
        r#"server {{
    listen 80;
    server_name {hostname};

    location / {{
        proxy_pass http://localhost:{port};
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection 'upgrade';
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_cache_bypass $http_upgrade;

        proxy_connect_timeout 60s;
        proxy_send_timeout 60s;
        proxy_read_timeout 60s;
    }}

{headers}}}
"#,
        hostname = hostname,
        port = port,
        headers = SECURITY_HEADERS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_unit() {
        let unit = static_unit("docs.launch.me", Path::new("/srv/projects/docs"));
        assert!(unit.contains("server_name docs.launch.me;"));
        assert!(unit.contains("root /srv/projects/docs;"));
        assert!(unit.contains("try_files $uri $uri/ /index.html;"));
        assert!(unit.contains("add_header Cache-Control \"public, immutable\";"));
        assert!(unit.contains("X-XSS-Protection"));
        assert!(!unit.contains("proxy_pass"));
    }

    #[test]
    fn test_proxy_unit() {
        let unit = proxy_unit("api.launch.me", 10432);
        assert!(unit.contains("proxy_pass http://localhost:10432;"));
        assert!(unit.contains("proxy_set_header Connection 'upgrade';"));
        assert!(unit.contains("proxy_read_timeout 60s;"));
        assert!(unit.contains("X-Frame-Options"));
        assert!(unit.trim_end().ends_with('}'));
    }

    #[test]
    fn test_braces_balance() {
        for unit in [
            static_unit("a.launch.me", Path::new("/srv/a")),
            proxy_unit("b.launch.me", 10001),
        ] {
            assert_eq!(unit.matches('{').count(), unit.matches('}').count());
        }
    }
}
