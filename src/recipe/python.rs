//! Python stack (requirements.txt)

use super::{StackRecipe, INTERNAL_PORT};
use std::path::Path;

pub struct PythonStack;

impl StackRecipe for PythonStack {
    fn name(&self) -> &str {
        "python"
    }

    fn detect(&self, project_dir: &Path) -> bool {
        project_dir.join("requirements.txt").exists()
    }

    fn default_start_command(&self) -> &str {
        r#"["python", "app.py"]"#
    }

    fn render(&self, start_command: &str) -> String {
        format!(
            "FROM python:3.11-slim\n\
             \n\
             WORKDIR /app\n\
             \n\
             COPY requirements.txt .\n\
             RUN pip install --no-cache-dir -r requirements.txt\n\
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
