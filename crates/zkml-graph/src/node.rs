//! A fully-resolved graph node.

use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::op::OpKind;

/// One operator instance with resolved shape, scale, and wiring.
///
/// The `Tabled` derive drives the `table` command; column order here is
/// the printed column order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Tabled)]
pub struct Node {
    /// The operator and its static attributes.
    #[tabled(display_with = "display_opkind")]
    pub opkind: OpKind,
    /// Fixed-point scale of the output tensor.
    pub out_scale: u32,
    /// Ids of the nodes feeding this one, in declaration order.
    #[tabled(display_with = "display_vector")]
    pub inputs: Vec<usize>,
    /// Shape of the output tensor.
    #[tabled(display_with = "display_vector")]
    pub out_dims: Vec<usize>,
    /// This node's id.
    pub idx: usize,
}

fn display_opkind(op: &OpKind) -> String {
    op.as_string().to_string()
}

fn display_vector<T: fmt::Debug>(v: &Vec<T>) -> String {
    if v.is_empty() {
        String::new()
    } else {
        format!("{v:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_helpers() {
        assert_eq!(display_opkind(&OpKind::GlobalSumPool), "GlobalSumPool");
        assert_eq!(display_vector::<usize>(&vec![]), "");
        assert_eq!(display_vector(&vec![1usize, 2]), "[1, 2]");
    }
}
