//! Graph-introspection metadata
//!
//! A [`NodeMeta`] carries what an external graph serializer needs to describe
//! one node: its name, the op it runs, the names of the arrays it reads and
//! writes, and the shape and dtype of its (first) output. With the `serde`
//! feature it serializes directly.

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::ops::{OpArgs, OpRegistry};
use crate::tensor::{NDArray, ShapeDescriptor};

/// Metadata describing one graph node
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeMeta {
    /// Node name
    pub name: String,
    /// Name of the op the node runs
    pub op_name: String,
    /// Names of the input arrays
    pub inputs: Vec<String>,
    /// Names of the output arrays
    pub outputs: Vec<String>,
    /// Shape of the first output
    pub shape: Vec<usize>,
    /// Data type of the first output
    pub dtype: DType,
}

impl NodeMeta {
    /// Metadata for a node whose first output is described by `output`
    pub fn new(name: impl Into<String>, op_name: impl Into<String>, output: &ShapeDescriptor) -> Self {
        Self {
            name: name.into(),
            op_name: op_name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            shape: output.shape().to_vec(),
            dtype: output.dtype(),
        }
    }

    /// Set the input names
    pub fn with_inputs<S: Into<String>>(mut self, inputs: impl IntoIterator<Item = S>) -> Self {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the output names
    pub fn with_outputs<S: Into<String>>(mut self, outputs: impl IntoIterator<Item = S>) -> Self {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    /// Describe a node running registered op `op_name` over named inputs
    ///
    /// The output shape comes from the op's shape function; nothing is
    /// executed. Outputs are named `{name}:0`, `{name}:1`, ...
    pub fn describe(
        registry: &OpRegistry,
        name: &str,
        op_name: &str,
        inputs: &[(&str, &NDArray)],
        args: &OpArgs,
    ) -> Result<Self> {
        let arrays: Vec<&NDArray> = inputs.iter().map(|&(_, a)| a).collect();
        let shapes = registry.calculate_output_shape(op_name, &arrays, args)?;
        let first = shapes
            .first()
            .ok_or_else(|| Error::Internal(format!("op '{op_name}' declares no outputs")))?;
        Ok(Self::new(name, op_name, first)
            .with_inputs(inputs.iter().map(|&(n, _)| n))
            .with_outputs((0..shapes.len()).map(|i| format!("{name}:{i}"))))
    }
}
