//! `shuffle` distribution: an array literal node wired into a shuffle node

use log::{info, warn};
use uuid::Uuid;

use crate::constants::{attributes, graph, node_types, seed as seeds};
use crate::distribution::inference::{infer_type, to_elements};
use crate::distribution::literal::Literal;
use crate::distribution::{DistributionArgs, DistributionContext};
use crate::error::{Result, SamplingError};
use crate::nodes::interface::{ArrayValue, NodeData};
use crate::nodes::types::ValueType;
use crate::nodes::NodeId;

/// Build a shuffle distribution over `choices`; returns the shuffle node.
///
/// `seed` defaults to the global-seed convention. Without a `name` the
/// shuffle node gets a generated unique name.
pub fn build_shuffle_distribution(
    ctx: &mut DistributionContext<'_>,
    choices: &[Literal],
    seed: Option<i64>,
    name: Option<&str>,
) -> Result<NodeId> {
    if choices.is_empty() {
        return Err(SamplingError::Validation("choices must not be empty".to_string()));
    }
    if let Some(name) = name {
        if name.is_empty() || name.contains(graph::SEPARATOR) {
            return Err(SamplingError::Validation(format!(
                "'{}' is not a valid node name",
                name
            )));
        }
    }

    let choices: Vec<Literal> = choices.iter().map(Literal::without_paths).collect();
    let tag = infer_type(&choices)?;
    let element_type = ValueType::from_tag(&tag)?;
    let array = ArrayValue::new(element_type, to_elements(&choices, element_type)?)?;

    let root = ctx.config.default_graph_root.trim_end_matches(graph::SEPARATOR);
    let shuffle_name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("SampleShuffle_{}", Uuid::new_v4().simple()));

    let array_node = ctx.engine.add_node(
        ctx.node_types,
        node_types::ARRAY,
        &format!("{}/{}_Array", root, shuffle_name),
        vec![
            (attributes::ARRAY_TYPE, NodeData::Token(tag.clone())),
            (attributes::ARRAY, NodeData::Array(array)),
        ],
    )?;

    let shuffle_node = match ctx.engine.add_node(
        ctx.node_types,
        node_types::SAMPLE_SHUFFLE,
        &format!("{}/{}", root, shuffle_name),
        vec![(attributes::SEED, NodeData::Int(seed.unwrap_or(seeds::USE_GLOBAL)))],
    ) {
        Ok(id) => id,
        Err(e) => {
            discard(ctx, &[array_node]);
            return Err(e);
        }
    };

    if let Err(e) = ctx
        .engine
        .connect(array_node, attributes::ARRAY, shuffle_node, attributes::CHOICES)
    {
        discard(ctx, &[shuffle_node, array_node]);
        return Err(e);
    }

    info!(
        "Created shuffle distribution {} over {} {} values",
        ctx.engine.node(shuffle_node)?.path,
        choices.len(),
        tag
    );
    Ok(shuffle_node)
}

/// Dynamic entry point registered as `shuffle`
pub fn shuffle(ctx: &mut DistributionContext<'_>, args: &DistributionArgs) -> Result<NodeId> {
    let seed = match &args.seed {
        None | Some(Literal::Null) => None,
        Some(Literal::Int(seed)) => Some(*seed),
        Some(other) => {
            return Err(SamplingError::Validation(format!(
                "seed must be an integer, got {}",
                other.kind()
            )))
        }
    };
    build_shuffle_distribution(ctx, &args.choices, seed, args.name.as_deref())
}

fn discard(ctx: &mut DistributionContext<'_>, nodes: &[NodeId]) {
    for node in nodes {
        if let Err(e) = ctx.engine.remove_node(*node) {
            warn!("Failed to discard partially built distribution node {}: {}", node, e);
        }
    }
}
