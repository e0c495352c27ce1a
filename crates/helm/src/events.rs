use crate::config::DeviceSettings;
use crate::interaction::{PlacementMap, PointerEvent, SlotIndex};
use esplink::{LinkStatus, SocketEvent};

#[derive(Debug, Clone)]
pub enum AppEvent {
    Pointer(PointerEvent),
    Remove(SlotIndex),
    ToggleEdit,
    Dump,
    Messages,
    ClearMessages,
    ConfigReload,
    Link(LinkRequest),
    LinkStatus(LinkStatus),
    Socket(SocketEvent),
}

/// Work for the device task. Sent with `try_send`; the interaction loop never waits on it.
#[derive(Debug, Clone)]
pub enum LinkRequest {
    Connect,
    Disconnect,
    Test,
    Push(PlacementMap),
    Configure(DeviceSettings),
}
