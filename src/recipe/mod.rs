//! Build recipe (Dockerfile) synthesis
//!
//! Stacks are tried in registration order and the first whose `detect` matches wins. The
//! generic stack is the fallback and always matches. Every generated recipe exposes the fixed
//! internal port; mapping it to the project's host port is the runtime's job.

mod generic;
mod go;
mod node;
mod python;

pub use generic::GenericStack;
pub use go::GoStack;
pub use node::NodeStack;
pub use python::PythonStack;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Recipe file a project can ship itself
pub const USER_RECIPE_FILE: &str = "Dockerfile";

/// Recipe file written by the synthesizer
pub const GENERATED_RECIPE_FILE: &str = "Dockerfile.generated";

/// Port every generated recipe exposes inside the container
pub const INTERNAL_PORT: u16 = 80;

/// A runtime stack that knows how to recognise a source tree and write its recipe
pub trait StackRecipe: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the tree at `project_dir` belongs to this stack
    fn detect(&self, project_dir: &Path) -> bool;

    /// `CMD` argument used when no launch command is configured
    fn default_start_command(&self) -> &str;

    /// Full recipe text with `start_command` as the `CMD` argument
    fn render(&self, start_command: &str) -> String;
}

/// Ordered stack list plus fallback
#[derive(Clone)]
pub struct RecipeSynthesizer {
    stacks: Vec<Arc<dyn StackRecipe>>,
    fallback: Arc<dyn StackRecipe>,
}

impl RecipeSynthesizer {
    /// A synthesizer with only the fallback stack
    pub fn new() -> Self {
        Self {
            stacks: Vec::new(),
            fallback: Arc::new(GenericStack),
        }
    }

    /// Node, then Python, then Go, then generic
    pub fn with_defaults() -> Self {
        let mut synthesizer = Self::new();
        synthesizer.register(Arc::new(NodeStack));
        synthesizer.register(Arc::new(PythonStack));
        synthesizer.register(Arc::new(GoStack));
        synthesizer
    }

    /// Appends a stack after those already registered, ahead of the fallback
    pub fn register(&mut self, stack: Arc<dyn StackRecipe>) {
        self.stacks.push(stack);
    }

    pub fn stack_names(&self) -> Vec<&str> {
        self.stacks
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|s| s.name())
            .collect()
    }

    pub fn detect(&self, project_dir: &Path) -> &dyn StackRecipe {
        self.stacks
            .iter()
            .find(|s| s.detect(project_dir))
            .map(|s| &**s)
            .unwrap_or(&*self.fallback)
    }

    /// Recipe text for the tree at `project_dir`.
    ///
    /// A non-blank `launch_command` replaces the stack's default start command verbatim.
    pub fn render(&self, project_dir: &Path, launch_command: Option<&str>) -> (String, String) {
        let stack = self.detect(project_dir);
        let start_command = launch_command
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| stack.default_start_command());
        (stack.name().to_string(), stack.render(start_command))
    }

    /// Writes `Dockerfile.generated` into `project_dir` and returns its path.
    pub async fn synthesize(
        &self,
        project_dir: &Path,
        launch_command: Option<&str>,
    ) -> io::Result<PathBuf> {
        let (stack, recipe) = self.render(project_dir, launch_command);
        let path = project_dir.join(GENERATED_RECIPE_FILE);
        tokio::fs::write(&path, recipe).await?;
        info!(stack = %stack, path = %path.display(), "Generated build recipe");
        Ok(path)
    }

    /// The project's own `Dockerfile`, if it ships one
    pub fn locate_user_recipe(project_dir: &Path) -> Option<PathBuf> {
        let path = project_dir.join(USER_RECIPE_FILE);
        path.is_file().then_some(path)
    }
}

impl Default for RecipeSynthesizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}
