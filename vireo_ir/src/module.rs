//! Module: the top-level code-generation container.

use crate::data::{Data, DataLabel, DataPayload};
use crate::function::Function;

/// A callable's shape: enough to build a call site against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub argc: usize,
}

impl FuncDecl {
    pub fn new(name: impl Into<String>, argc: usize) -> Self {
        Self { name: name.into(), argc }
    }
}

/// Top-level container: defined functions, extern declarations, and global
/// data.
#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    pub externs: Vec<FuncDecl>,
    pub data: Vec<Data>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            externs: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Define a function and hand back a builder reference to it.
    pub fn create_function(&mut self, name: impl Into<String>, argc: usize) -> &mut Function {
        self.functions.push(Function::new(name, argc));
        self.functions
            .last_mut()
            .expect("function was just pushed")
    }

    /// Declare an external function; the returned descriptor is the call
    /// target.
    pub fn create_extern(&mut self, name: impl Into<String>, argc: usize) -> FuncDecl {
        let decl = FuncDecl::new(name, argc);
        self.externs.push(decl.clone());
        decl
    }

    /// Attach a module-global data section.
    pub fn create_data(&mut self, read_only: bool, payload: DataPayload) -> DataLabel {
        let data = Data::new(read_only, payload);
        let label = data.handle();
        self.data.push(data);
        label
    }
}
