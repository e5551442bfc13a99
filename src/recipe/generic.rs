//! Fallback stack, used when no other stack recognises the tree

use super::{StackRecipe, INTERNAL_PORT};
use std::path::Path;

pub struct GenericStack;

impl StackRecipe for GenericStack {
    fn name(&self) -> &str {
        "generic"
    }

    fn detect(&self, _project_dir: &Path) -> bool {
        true
    }

    fn default_start_command(&self) -> &str {
        r#"["bash"]"#
    }

    fn render(&self, start_command: &str) -> String {
        format!(
            "FROM ubuntu:22.04\n\
             \n\
             WORKDIR /app\n\
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
