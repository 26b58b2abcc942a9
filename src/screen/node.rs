//! Raw accessibility tree nodes and the source that provides them.

use async_trait::async_trait;

use super::element::{Bounds, UiElement};
use crate::device::DeviceError;

/// A node of the platform UI tree, as reported by the accessibility layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UiNode {
    pub resource_id: String,
    pub text: String,
    pub content_description: String,
    pub class_name: String,
    pub bounds: Bounds,
    pub clickable: bool,
    pub editable: bool,
    pub scrollable: bool,
    pub visible_to_user: bool,
    pub children: Vec<UiNode>,
}

impl UiNode {
    /// Convert this node (without children) into an element.
    pub fn to_element(&self) -> UiElement {
        UiElement {
            id: self.resource_id.clone(),
            text: self.text.clone(),
            label: self.content_description.clone(),
            class_name: self.class_name.clone(),
            bounds: self.bounds,
            clickable: self.clickable,
            editable: self.editable,
            scrollable: self.scrollable,
            visible: self.visible_to_user,
        }
    }

    /// Pre-order iterator over this node and all descendants.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// First node in pre-order whose bounds equal `bounds` and that accepts text.
    pub fn find_editable_by_bounds(&self, bounds: &Bounds) -> Option<&UiNode> {
        self.iter()
            .find(|node| node.bounds == *bounds && node.editable)
    }
}

/// Pre-order traversal using an explicit stack.
pub struct PreOrder<'a> {
    stack: Vec<&'a UiNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a UiNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Supplies snapshots of the current UI tree.
#[async_trait]
pub trait UiTreeSource: Send + Sync {
    /// Root of the active window, or `None` when no window is available.
    async fn root(&self) -> Result<Option<UiNode>, DeviceError>;
}
