//! Node.js stack (package.json)

use super::{StackRecipe, INTERNAL_PORT};
use std::path::Path;

pub struct NodeStack;

impl StackRecipe for NodeStack {
    fn name(&self) -> &str {
        "node"
    }

    fn detect(&self, project_dir: &Path) -> bool {
        project_dir.join("package.json").exists()
    }

    fn default_start_command(&self) -> &str {
        r#"["npm", "start"]"#
    }

    fn render(&self, start_command: &str) -> String {
        format!(
            "FROM node:18-alpine\n\
             \n\
             WORKDIR /app\n\
             \n\
             COPY package*.json ./\n\
             RUN npm install\n\
             \n\
             COPY . .\n\
             \n\
             EXPOSE {port}\n\
             \n\
             CMD {cmd}\n",
            port = INTERNAL_PORT,
            cmd = start_command
        )
    }
}
