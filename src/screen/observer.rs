//! Screen observer that turns UI tree snapshots into observations.

use std::sync::Arc;

use super::node::UiTreeSource;
use super::observation::Observation;
use crate::device::DeviceError;

/// Captures the current screen as an [`Observation`].
pub struct ScreenObserver {
    source: Arc<dyn UiTreeSource>,
}

impl ScreenObserver {
    /// Create an observer over a tree source.
    pub fn new(source: Arc<dyn UiTreeSource>) -> Self {
        Self { source }
    }

    /// Walk the current tree once and keep every useful node in pre-order.
    ///
    /// A missing root is not an error: it produces an empty observation.
    pub async fn observe(&self) -> Result<Observation, DeviceError> {
        let root = match self.source.root().await? {
            Some(root) => root,
            None => {
                tracing::debug!("No active window, returning empty observation");
                return Ok(Observation::empty());
            }
        };

        let elements = root
            .iter()
            .map(|node| node.to_element())
            .filter(|element| element.is_useful())
            .collect::<Vec<_>>();

        tracing::debug!("Observed {} useful elements", elements.len());
        Ok(Observation::new(elements))
    }

    /// The underlying tree source.
    pub fn source(&self) -> &Arc<dyn UiTreeSource> {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::{Bounds, UiNode};
    use crate::testing::StaticTree;

    fn leaf(text: &str, visible: bool) -> UiNode {
        UiNode {
            text: text.to_string(),
            class_name: "android.widget.TextView".to_string(),
            bounds: Bounds::new(0, 0, 10, 10),
            visible_to_user: visible,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let observer = ScreenObserver::new(Arc::new(StaticTree::new(None)));
        let obs = observer.observe().await.unwrap();
        assert!(obs.is_empty());
    }

    #[tokio::test]
    async fn test_only_useful_elements_in_pre_order() {
        let container = UiNode {
            class_name: "android.widget.FrameLayout".to_string(),
            visible_to_user: true,
            children: vec![
                leaf("first", true),
                leaf("hidden", false),
                UiNode {
                    visible_to_user: true,
                    children: vec![leaf("nested", true)],
                    ..Default::default()
                },
                leaf("", true),
                leaf("last", true),
            ],
            ..Default::default()
        };
        let observer = ScreenObserver::new(Arc::new(StaticTree::new(Some(container))));

        let obs = observer.observe().await.unwrap();
        let texts: Vec<&str> = obs.elements.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "nested", "last"]);
        assert!(obs.elements.iter().all(|e| e.is_useful()));
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let tree = StaticTree::new(None);
        tree.fail_next("dump failed");
        let observer = ScreenObserver::new(Arc::new(tree));
        assert!(observer.observe().await.is_err());
    }
}
