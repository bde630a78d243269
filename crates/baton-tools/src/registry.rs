//! The tool set an agent exposes on one turn.
//!
//! [`ToolRegistry`] is rebuilt every turn from the agent's declared tools plus
//! the freshest remote-server listings, so calls always resolve against the
//! latest discovery.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use baton_core::ToolSpec;
use tracing::debug;

use crate::computer::ComputerTool;
use crate::errors::ToolError;
use crate::function::FunctionTool;
use crate::hosted::{FileSearchTool, WebSearchTool};

/// A tool an agent declares.
#[derive(Clone)]
pub enum Tool {
    /// Runtime-executed function.
    Function(Arc<dyn FunctionTool>),
    /// Provider-hosted file search.
    FileSearch(FileSearchTool),
    /// Provider-hosted web search.
    WebSearch(WebSearchTool),
    /// Device control.
    Computer(ComputerTool),
}

impl Tool {
    /// Wrap a function tool.
    pub fn function(tool: impl FunctionTool + 'static) -> Self {
        Self::Function(Arc::new(tool))
    }

    /// Tool name.
    pub fn name(&self) -> &str {
        match self {
            Self::Function(f) => f.name(),
            Self::FileSearch(_) => "file_search",
            Self::WebSearch(_) => "web_search_preview",
            Self::Computer(c) => c.name(),
        }
    }

    /// Provider-neutral description.
    pub fn spec(&self) -> ToolSpec {
        match self {
            Self::Function(f) => f.spec(),
            Self::FileSearch(t) => t.spec(),
            Self::WebSearch(t) => t.spec(),
            Self::Computer(c) => c.spec(),
        }
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tool").field(&self.name()).finish()
    }
}

/// Name-indexed tools for one turn.
///
/// Function names must be unique across local tools and server tools. At most
/// one computer tool is allowed.
#[derive(Default)]
pub struct ToolRegistry {
    ordered: Vec<Tool>,
    functions: HashMap<String, (Arc<dyn FunctionTool>, String)>,
    computer: Option<ComputerTool>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from declared tools and discovered server tools.
    pub fn assemble(declared: &[Tool], server_tools: Vec<Arc<dyn FunctionTool>>) -> Result<Self, ToolError> {
        let mut registry = Self::new();
        for tool in declared {
            registry.register(tool.clone(), "agent tools")?;
        }
        for tool in server_tools {
            registry.register(Tool::Function(tool), "tool server")?;
        }
        Ok(registry)
    }

    /// Add a tool; `source` labels it in collision errors.
    pub fn register(&mut self, tool: Tool, source: &str) -> Result<(), ToolError> {
        match &tool {
            Tool::Function(f) => {
                if let Some((_, first)) = self.functions.get(f.name()) {
                    return Err(ToolError::DuplicateName {
                        name: f.name().to_owned(),
                        first: first.clone(),
                        second: source.to_owned(),
                    });
                }
                let _ = self
                    .functions
                    .insert(f.name().to_owned(), (Arc::clone(f), source.to_owned()));
            }
            Tool::Computer(c) => {
                if self.computer.is_some() {
                    return Err(ToolError::Configuration {
                        message: "an agent may declare at most one computer tool".to_owned(),
                    });
                }
                self.computer = Some(c.clone());
            }
            Tool::FileSearch(_) | Tool::WebSearch(_) => {}
        }
        debug!(tool_name = tool.name(), source, "tool registered");
        self.ordered.push(tool);
        Ok(())
    }

    /// Function tool by name.
    pub fn function(&self, name: &str) -> Option<Arc<dyn FunctionTool>> {
        self.functions.get(name).map(|(tool, _)| Arc::clone(tool))
    }

    /// The computer tool, if declared.
    pub fn computer(&self) -> Option<&ComputerTool> {
        self.computer.as_ref()
    }

    /// Specs in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.ordered.iter().map(Tool::spec).collect()
    }

    /// All tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ordered.iter().map(|t| t.name().to_owned()).collect();
        names.sort();
        names
    }

    /// Whether a tool with `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.ordered.iter().any(|t| t.name() == name)
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computer::MockComputer;
    use crate::function::FnTool;
    use assert_matches::assert_matches;
    use serde_json::{Value, json};

    fn tool(name: &str) -> Tool {
        Tool::function(FnTool::raw(name, "stub", json!({}), |_ctx, _args| async move { Ok(Value::Null) }))
    }

    fn computer() -> Tool {
        Tool::Computer(ComputerTool::new(Arc::new(MockComputer::new())))
    }

    #[test]
    fn assemble_keeps_declaration_order() {
        let registry = ToolRegistry::assemble(
            &[tool("b"), Tool::WebSearch(WebSearchTool::default()), tool("a")],
            vec![],
        )
        .unwrap();
        let names: Vec<String> = registry.specs().iter().map(|s| s.name().to_owned()).collect();
        assert_eq!(names, vec!["b", "web_search_preview", "a"]);
        assert_eq!(registry.names(), vec!["a", "b", "web_search_preview"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn lookup_by_name() {
        let registry = ToolRegistry::assemble(&[tool("test")], vec![]).unwrap();
        assert!(registry.function("test").is_some());
        assert!(registry.function("missing").is_none());
        assert!(registry.contains("test"));
    }

    #[test]
    fn local_and_server_collision_is_rejected() {
        let server_tool: Arc<dyn FunctionTool> =
            Arc::new(FnTool::raw("dup", "remote", json!({}), |_ctx, _args| async move { Ok(Value::Null) }));
        let err = ToolRegistry::assemble(&[tool("dup")], vec![server_tool]).err().unwrap();
        assert_matches!(err, ToolError::DuplicateName { ref first, ref second, .. }
            if first == "agent tools" && second == "tool server");
    }

    #[test]
    fn two_computer_tools_are_rejected() {
        let err = ToolRegistry::assemble(&[computer(), computer()], vec![]).err().unwrap();
        assert_matches!(err, ToolError::Configuration { .. });
        assert!(err.is_configuration());
    }

    #[test]
    fn computer_is_exposed() {
        let registry = ToolRegistry::assemble(&[computer()], vec![]).unwrap();
        assert!(registry.computer().is_some());
        assert!(registry.function("computer_use_preview").is_none());
    }

    #[test]
    fn empty_registry() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.computer().is_none());
    }
}
