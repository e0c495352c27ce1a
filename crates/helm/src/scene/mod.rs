//! Stand-in for the presentation layer: element frames in paint order, the drag proxy and
//! the hover highlight. Nothing here draws; a renderer reads it.

pub mod layout;

pub use layout::{WheelLayout, build_wheel};

use crate::catalog::ActionId;
use crate::geometry::{Point, Rect};
use crate::interaction::SlotIndex;
use derive_more::{Display, From, Into};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct ElementId(u32);

/// Read access to element geometry, as the hit-test resolver needs it.
pub trait Surface {
    /// Topmost attached element containing `point`, skipping pass-through elements.
    fn element_at(&self, point: Point) -> Option<ElementId>;

    /// `None` once the element is detached.
    fn bounds(&self, element: ElementId) -> Option<Rect>;
}

/// The writes a drag session makes to the presentation layer.
pub trait DragSurface: Surface {
    /// Adds a pass-through proxy on top of everything else.
    fn show_proxy(&mut self, action: ActionId, frame: Rect) -> ElementId;
    fn move_proxy(&mut self, proxy: ElementId, frame: Rect);
    fn remove_proxy(&mut self, proxy: ElementId);
    fn set_highlight(&mut self, slot: Option<SlotIndex>);
}

#[derive(Debug, Clone)]
struct Node {
    frame: Rect,
    pass_through: bool,
    attached: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proxy {
    pub element: ElementId,
    pub action: ActionId,
    pub frame: Rect,
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<Node>,
    highlighted: Option<SlotIndex>,
    proxy: Option<Proxy>,
    /// Allocated by the first drag and re-attached by every later one.
    proxy_node: Option<ElementId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element above all existing ones.
    pub fn insert(&mut self, frame: Rect) -> ElementId {
        self.push(frame, false)
    }

    pub fn insert_pass_through(&mut self, frame: Rect) -> ElementId {
        self.push(frame, true)
    }

    fn push(&mut self, frame: Rect, pass_through: bool) -> ElementId {
        let id = ElementId(self.nodes.len() as u32);
        self.nodes.push(Node {
            frame,
            pass_through,
            attached: true,
        });
        id
    }

    pub fn set_frame(&mut self, element: ElementId, frame: Rect) {
        if let Some(node) = self.node_mut(element) {
            node.frame = frame;
        }
    }

    pub fn detach(&mut self, element: ElementId) {
        if let Some(node) = self.node_mut(element) {
            node.attached = false;
        }
    }

    pub fn is_attached(&self, element: ElementId) -> bool {
        self.node(element).is_some_and(|n| n.attached)
    }

    /// Number of elements ever inserted, detached ones included. The drag proxy counts once.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn highlighted(&self) -> Option<SlotIndex> {
        self.highlighted
    }

    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }

    fn node(&self, element: ElementId) -> Option<&Node> {
        self.nodes.get(element.0 as usize)
    }

    fn node_mut(&mut self, element: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(element.0 as usize)
    }
}

impl Surface for Scene {
    fn element_at(&self, point: Point) -> Option<ElementId> {
        self.nodes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, n)| n.attached && !n.pass_through && n.frame.contains(point))
            .map(|(i, _)| ElementId(i as u32))
    }

    fn bounds(&self, element: ElementId) -> Option<Rect> {
        self.node(element).filter(|n| n.attached).map(|n| n.frame)
    }
}

impl DragSurface for Scene {
    fn show_proxy(&mut self, action: ActionId, frame: Rect) -> ElementId {
        let element = match self.proxy_node {
            Some(element) => {
                if let Some(node) = self.node_mut(element) {
                    node.frame = frame;
                    node.attached = true;
                }
                element
            }
            None => {
                let element = self.insert_pass_through(frame);
                self.proxy_node = Some(element);
                element
            }
        };
        self.proxy = Some(Proxy {
            element,
            action,
            frame,
        });
        element
    }

    fn move_proxy(&mut self, proxy: ElementId, frame: Rect) {
        self.set_frame(proxy, frame);
        if let Some(p) = self.proxy.as_mut().filter(|p| p.element == proxy) {
            p.frame = frame;
        }
    }

    fn remove_proxy(&mut self, proxy: ElementId) {
        self.detach(proxy);
        if self.proxy.is_some_and(|p| p.element == proxy) {
            self.proxy = None;
        }
    }

    fn set_highlight(&mut self, slot: Option<SlotIndex>) {
        self.highlighted = slot;
    }
}
