//! Go stack (go.mod), two-stage build onto alpine

use super::{StackRecipe, INTERNAL_PORT};
use std::path::Path;

pub struct GoStack;

impl StackRecipe for GoStack {
    fn name(&self) -> &str {
        "go"
    }

    fn detect(&self, project_dir: &Path) -> bool {
        project_dir.join("go.mod").exists()
    }

    fn default_start_command(&self) -> &str {
        r#"["./main"]"#
    }

    fn render(&self, start_command: &str) -> String {
        format!(
            "FROM golang:1.21-alpine AS builder\n\
             \n\
             WORKDIR /app\n\
             \n\
             COPY go.* ./\n\
             RUN go mod download\n\
             \n\
             COPY . .\n\
             RUN go build -o main .\n\
             \n\
             FROM alpine:latest\n\
             WORKDIR /app\n\
             COPY --from=builder /app/main .\n\
             \n\
             EXPOSE {port}\n\
             \n\
             CMD {cmd}\n",
            port = INTERNAL_PORT,
            cmd = start_command
        )
    }
}
