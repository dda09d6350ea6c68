//! Array node lifecycle: resolve ports from `arrayType`, pass the array through

use log::debug;

use crate::constants::attributes;
use crate::error::{Result, SamplingError};
use crate::nodes::hooks::{ComputeContext, GraphContext, NodeExecutionHooks};
use crate::nodes::interface::NodeData;
use crate::nodes::types::{AttributeType, ValueType};
use crate::nodes::Node;

pub struct ArrayHooks;

impl ArrayHooks {
    /// Array type named by the authored `arrayType`, if any
    fn authored_type(node: &Node) -> Result<Option<ValueType>> {
        match node.parameter(attributes::ARRAY_TYPE) {
            Some(NodeData::Token(tag)) if !tag.is_empty() => {
                Ok(Some(ValueType::from_tag(tag)?.as_array()))
            }
            Some(NodeData::Token(_)) | Some(NodeData::None) | None => Ok(None),
            Some(other) => Err(SamplingError::Graph(format!(
                "{}.{} must be a token, got {:?}",
                node.path,
                attributes::ARRAY_TYPE,
                other
            ))),
        }
    }
}

impl NodeExecutionHooks for ArrayHooks {
    fn initialize(&self, _ctx: &mut GraphContext<'_>, node: &mut Node) -> Result<()> {
        let Some(array_type) = Self::authored_type(node)? else {
            debug!("{} has no arrayType; ports stay unresolved", node.path);
            return Ok(());
        };

        if let Some(value) = node.parameter(attributes::ARRAY) {
            if let Some(actual) = value.value_type() {
                if actual != array_type {
                    return Err(SamplingError::TypeMismatch(format!(
                        "{} holds {} but arrayType is {}",
                        node.path, actual, array_type
                    )));
                }
            }
        }

        let resolved = AttributeType::Resolved(array_type);
        if let Some(port) = node.input_mut(attributes::ARRAY) {
            port.resolve(resolved);
        }
        if let Some(port) = node.output_mut(attributes::ARRAY) {
            port.resolve(resolved);
        }
        debug!("{} resolved to {}", node.path, array_type);
        Ok(())
    }

    fn compute(&self, ctx: &mut ComputeContext<'_>) -> Result<bool> {
        let Some(value) = ctx.input(attributes::ARRAY).cloned() else {
            return Ok(false);
        };
        if value.as_array().is_none() {
            return Err(SamplingError::evaluation(
                ctx.identity(),
                format!("input array is not an array: {:?}", value),
            ));
        }
        ctx.set_output(attributes::ARRAY, value)?;
        Ok(true)
    }
}
