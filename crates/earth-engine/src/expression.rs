//! Earth Engine expression graphs.
//!
//! An [`Expression`] is a table of named value nodes plus the name of the
//! node to evaluate. Nodes are constants, arrays, dictionaries, function
//! invocations, or references to other named nodes, serialized in the
//! REST API's `Expression` JSON form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One node of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    ConstantValue(serde_json::Value),
    ArrayValue {
        values: Vec<ValueNode>,
    },
    DictionaryValue {
        values: BTreeMap<String, ValueNode>,
    },
    FunctionInvocationValue {
        #[serde(rename = "functionName")]
        function_name: String,
        #[serde(default)]
        arguments: BTreeMap<String, ValueNode>,
    },
    ValueReference(String),
}

impl ValueNode {
    pub fn constant(value: impl Into<serde_json::Value>) -> Self {
        ValueNode::ConstantValue(value.into())
    }

    pub fn array(values: impl IntoIterator<Item = ValueNode>) -> Self {
        ValueNode::ArrayValue {
            values: values.into_iter().collect(),
        }
    }

    /// Invoke a server-side algorithm with named arguments.
    pub fn invoke<'a>(
        function_name: &str,
        arguments: impl IntoIterator<Item = (&'a str, ValueNode)>,
    ) -> Self {
        ValueNode::FunctionInvocationValue {
            function_name: function_name.to_string(),
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    pub fn reference(name: &str) -> Self {
        ValueNode::ValueReference(name.to_string())
    }

    /// The algorithm name when this node is an invocation.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            ValueNode::FunctionInvocationValue { function_name, .. } => Some(function_name),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn argument(&self, name: &str) -> Option<&ValueNode> {
        match self {
            ValueNode::FunctionInvocationValue { arguments, .. } => arguments.get(name),
            _ => None,
        }
    }
}

/// A complete expression ready to send to `value:compute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub result: String,
    pub values: BTreeMap<String, ValueNode>,
}

impl Expression {
    /// Look up the node a reference points to, following chained references.
    #[cfg(test)]
    pub fn resolve<'a>(&'a self, node: &'a ValueNode) -> Option<&'a ValueNode> {
        let mut current = node;
        // Bounded by the table size, so a reference cycle cannot loop forever.
        for _ in 0..=self.values.len() {
            match current {
                ValueNode::ValueReference(name) => current = self.values.get(name)?,
                other => return Some(other),
            }
        }
        None
    }

    /// The node that will be evaluated.
    pub fn root(&self) -> Option<&ValueNode> {
        self.values.get(&self.result)
    }
}

/// Builds an [`Expression`], letting shared subgraphs be stored once and
/// referenced wherever they are used.
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    values: BTreeMap<String, ValueNode>,
    next_id: usize,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `node` in the value table and return a reference to it.
    pub fn bind(&mut self, node: ValueNode) -> ValueNode {
        ValueNode::ValueReference(self.insert(node))
    }

    /// Finish with `result` as the node to evaluate.
    pub fn finish(mut self, result: ValueNode) -> Expression {
        let result = match result {
            ValueNode::ValueReference(name) => name,
            node => self.insert(node),
        };

        Expression {
            result,
            values: self.values,
        }
    }

    fn insert(&mut self, node: ValueNode) -> String {
        let name = self.next_id.to_string();
        self.next_id += 1;
        self.values.insert(name.clone(), node);
        name
    }
}
