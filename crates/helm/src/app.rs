use crate::catalog::Catalog;
use crate::config::{self, Config};
use crate::events::{AppEvent, LinkRequest};
use crate::interaction::{
    DragOutcome, EditMode, Engine, Interaction, Origin, PlacementMap, PlacementStore,
    PointerEvent, SlotIndex,
};
use crate::scene::{Scene, build_wheel};
use async_channel::{Receiver, Sender, TrySendError};
use esplink::{LinkStatus, SocketEvent, SocketMessage};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

/// Device messages kept for `messages`; older ones are dropped first.
pub const MESSAGE_HISTORY: usize = 200;

pub struct AppModel {
    engine: Engine<Scene>,
    config: Config,
    link: Sender<LinkRequest>,
    link_status: LinkStatus,
    messages: VecDeque<SocketMessage>,
}

#[derive(Debug)]
pub enum AppMsg {
    Pointer(PointerEvent),
    Tick(Instant),
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

impl From<AppEvent> for AppMsg {
    fn from(event: AppEvent) -> Self {
        match event {
            AppEvent::Pointer(p) => AppMsg::Pointer(p),
            AppEvent::Remove(slot) => AppMsg::Remove(slot),
            AppEvent::ToggleEdit => AppMsg::ToggleEdit,
            AppEvent::Dump => AppMsg::Dump,
            AppEvent::Messages => AppMsg::Messages,
            AppEvent::ClearMessages => AppMsg::ClearMessages,
            AppEvent::ConfigReload => AppMsg::ConfigReload,
            AppEvent::Link(request) => AppMsg::Link(request),
            AppEvent::LinkStatus(status) => AppMsg::LinkStatus(status),
            AppEvent::Socket(event) => AppMsg::Socket(event),
        }
    }
}

impl AppModel {
    pub fn new(config: Config, link: Sender<LinkRequest>) -> Self {
        let catalog = Rc::new(Catalog::builtin());
        let (scene, registry) = build_wheel(&catalog, &config.layout);
        let store = PlacementStore::new(config.placements(&catalog));
        let engine = Engine::new(
            scene,
            registry,
            catalog,
            store,
            EditMode::default(),
            config.gesture.engine_config(),
        );

        Self {
            engine,
            config,
            link,
            link_status: LinkStatus::default(),
            messages: VecDeque::new(),
        }
    }

    pub fn engine(&self) -> &Engine<Scene> {
        &self.engine
    }

    pub fn placements(&self) -> PlacementMap {
        *self.engine.placements().snapshot()
    }

    pub fn link_status(&self) -> &LinkStatus {
        &self.link_status
    }

    /// Oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &SocketMessage> {
        self.messages.iter()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.engine.next_deadline()
    }

    pub fn update(&mut self, msg: AppMsg) {
        match msg {
            AppMsg::Pointer(event) => {
                for interaction in self.engine.handle_pointer(&event) {
                    self.on_interaction(interaction);
                }
            }
            AppMsg::Tick(now) => {
                for interaction in self.engine.tick(now) {
                    self.on_interaction(interaction);
                }
            }
            AppMsg::Remove(slot) => {
                if self.edit_mode().is_active() {
                    self.clear_slot(slot);
                } else {
                    log::warn!("Remove of slot {} ignored outside edit mode", slot);
                }
            }
            AppMsg::ToggleEdit => {
                let active = self.edit_mode().toggle();
                log::info!("Edit mode {}", if active { "on" } else { "off" });
            }
            AppMsg::Dump => match serde_json::to_string(&self.placements()) {
                Ok(json) => log::info!("Placements: {}", json),
                Err(e) => log::error!("Failed to serialize placements: {}", e),
            },
            AppMsg::Messages => {
                log::info!("{} device message(s)", self.messages.len());
                for message in &self.messages {
                    match serde_json::to_string(message) {
                        Ok(json) => log::info!("  {}", json),
                        Err(e) => log::error!("Failed to serialize message: {}", e),
                    }
                }
            }
            AppMsg::ClearMessages => {
                self.messages.clear();
                log::info!("Device messages cleared");
            }
            AppMsg::ConfigReload => match config::load_config() {
                Ok(new_config) => {
                    self.apply_config(new_config);
                    log::info!("Configuration reloaded");
                }
                Err(e) => log::error!("Failed to reload config: {}", e),
            },
            AppMsg::Link(request) => self.request(request),
            AppMsg::LinkStatus(status) => {
                match &status.error {
                    Some(error) => log::warn!("Device {}: {}", status.state, error),
                    None => log::info!("Device {}", status.state),
                }
                self.link_status = status;
            }
            AppMsg::Socket(event) => match event {
                SocketEvent::Message(message) => self.record_message(message),
                SocketEvent::Error(e) => log::debug!("{}", e),
                other => log::info!("WebSocket {:?}", other),
            },
        }
    }

    /// Re-applies gesture timings, proxy size and device settings. Placements and layout
    /// stay as they are.
    pub fn apply_config(&mut self, new_config: Config) {
        self.engine.reconfigure(new_config.gesture.engine_config());
        if new_config.device != self.config.device {
            self.request(LinkRequest::Configure(new_config.device.clone()));
        }
        self.config = new_config;
    }

    fn record_message(&mut self, message: SocketMessage) {
        match &message {
            SocketMessage::Json { data } => log::info!("Device says: {}", data),
            SocketMessage::Text { data, .. } => log::info!("Device says: {}", data),
        }
        if self.messages.len() == MESSAGE_HISTORY {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    fn edit_mode(&self) -> &EditMode {
        self.engine.edit_mode()
    }

    fn on_interaction(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::Tapped(Origin::DeleteAffordance(slot)) if self.edit_mode().is_active() => {
                self.clear_slot(slot);
            }
            Interaction::Tapped(Origin::Background) if self.edit_mode().is_active() => {
                self.edit_mode().set(false);
                log::info!("Edit mode off");
            }
            Interaction::Dropped(DragOutcome::Committed(_)) => self.push_placements(),
            Interaction::DragRejected(e) => log::debug!("{}", e),
            other => log::debug!("{:?}", other),
        }
    }

    fn clear_slot(&mut self, slot: SlotIndex) {
        let before = self.placements();
        let after = self.engine.placements().clear(slot);
        if *after != before {
            log::info!("Cleared slot {}", slot);
            self.push_placements();
        }
    }

    fn push_placements(&self) {
        self.request(LinkRequest::Push(self.placements()));
    }

    fn request(&self, request: LinkRequest) {
        match self.link.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                log::warn!("Device queue full, dropping {:?}", request)
            }
            Err(TrySendError::Closed(_)) => log::error!("Device link is gone"),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

/// Single-threaded interaction loop: app events, plus a wake-up whenever a gesture timer
/// is due. Queued events always drain before a timer wake-up.
pub async fn run(mut model: AppModel, rx: Receiver<AppEvent>) {
    loop {
        let deadline = model.next_deadline();
        tokio::select! {
            biased;
            event = rx.recv() => match event {
                Ok(event) => model.update(AppMsg::from(event)),
                Err(_) => break,
            },
            _ = sleep_until(deadline) => model.update(AppMsg::Tick(Instant::now())),
        }
    }
    log::info!("Event channel closed, shutting down");
}
