mod client;
mod host;

use crate::net::{DenyReason, HOST_PEER_ID, LobbyData, MAX_PLAYERS, PROTOCOL_VERSION, SlotInfo};

pub use client::{ClientLobby, JoinState};
pub use host::{HostLobby, LobbyEvent};

pub const HERO_CATALOG: [&str; 5] = [
    "knight_blue",
    "knight_green",
    "knight_red",
    "knight_yellow",
    "knight_purple",
];

pub const DEFAULT_MAP_ID: &str = "level1";

/// `"hero.<name>"` for a catalogue index, wrapping out-of-range indices.
pub fn hero_key(index: u32) -> String {
    format!("hero.{}", HERO_CATALOG[index as usize % HERO_CATALOG.len()])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySlot {
    pub index: u32,
    pub peer_id: Option<String>,
    /// The seat belonging to this process.
    pub is_local: bool,
    pub hero_index: u32,
    pub ready: bool,
    pub name: String,
}

impl LobbySlot {
    pub fn open(index: u32) -> Self {
        Self {
            index,
            peer_id: None,
            is_local: false,
            hero_index: 0,
            ready: false,
            name: default_name(index),
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.peer_id.is_some() || self.is_local
    }

    pub fn info(&self) -> SlotInfo {
        SlotInfo {
            index: self.index,
            peer_id: self.peer_id.clone(),
            hero_index: self.hero_index,
            ready: self.ready,
            name: self.name.clone(),
        }
    }

    /// Mirrors a host-reported seat; `local_peer_id` marks our own.
    pub fn from_info(info: &SlotInfo, local_peer_id: Option<&str>) -> Self {
        Self {
            index: info.index,
            peer_id: info.peer_id.clone(),
            is_local: info.peer_id.is_some() && info.peer_id.as_deref() == local_peer_id,
            hero_index: info.hero_index,
            ready: info.ready,
            name: info.name.clone(),
        }
    }

    fn reset(&mut self) {
        *self = Self::open(self.index);
    }
}

fn default_name(index: u32) -> String {
    format!("Player {}", index + 1)
}

/// Host-side seat bookkeeping. Pure state; [`HostLobby`] puts it on the wire.
#[derive(Debug, Clone)]
pub struct Lobby {
    slots: Vec<LobbySlot>,
    map_id: String,
    started: bool,
}

impl Default for Lobby {
    fn default() -> Self {
        Self::hosted(MAX_PLAYERS)
    }
}

impl Lobby {
    /// A lobby with every seat open.
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: (0..slot_count as u32).map(LobbySlot::open).collect(),
            map_id: DEFAULT_MAP_ID.to_string(),
            started: false,
        }
    }

    /// A lobby whose first seat is taken by the host itself.
    pub fn hosted(slot_count: usize) -> Self {
        let mut lobby = Self::new(slot_count);
        if let Some(slot) = lobby.slots.first_mut() {
            slot.peer_id = Some(HOST_PEER_ID.to_string());
            slot.is_local = true;
        }
        lobby
    }

    pub fn with_map(mut self, map_id: impl Into<String>) -> Self {
        self.map_id = map_id.into();
        self
    }

    pub fn slots(&self) -> &[LobbySlot] {
        &self.slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(LobbySlot::is_occupied)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn slot_of(&self, peer_id: &str) -> Option<&LobbySlot> {
        self.slots
            .iter()
            .find(|s| s.peer_id.as_deref() == Some(peer_id))
    }

    fn slot_of_mut(&mut self, peer_id: &str) -> Option<&mut LobbySlot> {
        self.slots
            .iter_mut()
            .find(|s| s.peer_id.as_deref() == Some(peer_id))
    }

    /// Lowest `peer:N` no seat currently holds.
    fn free_peer_id(&self) -> String {
        (1..)
            .map(|n| format!("peer:{}", n))
            .find(|id| self.slot_of(id).is_none())
            .unwrap_or_default()
    }

    /// Seats a new peer, returning its freshly allocated id.
    pub fn join(&mut self, protocol: u32, name: &str) -> Result<String, DenyReason> {
        if protocol != PROTOCOL_VERSION {
            return Err(DenyReason::ProtocolMismatch);
        }
        if self.started {
            return Err(DenyReason::InProgress);
        }

        let peer_id = self.free_peer_id();
        let slot = self
            .slots
            .iter_mut()
            .find(|s| !s.is_occupied())
            .ok_or(DenyReason::Full)?;

        slot.peer_id = Some(peer_id.clone());
        slot.hero_index = 0;
        slot.ready = false;
        slot.name = if name.trim().is_empty() {
            default_name(slot.index)
        } else {
            name.trim().to_string()
        };

        Ok(peer_id)
    }

    /// Applies a seat change. Returns false when no seat holds `peer_id`.
    pub fn apply_update(
        &mut self,
        peer_id: &str,
        hero_index: Option<u32>,
        ready: Option<bool>,
    ) -> bool {
        let Some(slot) = self.slot_of_mut(peer_id) else {
            return false;
        };

        if let Some(hero_index) = hero_index {
            slot.hero_index = hero_index % HERO_CATALOG.len() as u32;
        }
        if let Some(ready) = ready {
            slot.ready = ready;
        }
        true
    }

    /// Frees the seat held by `peer_id`. The host's own seat cannot be freed.
    pub fn remove_peer(&mut self, peer_id: &str) -> bool {
        match self.slot_of_mut(peer_id) {
            Some(slot) if !slot.is_local => {
                slot.reset();
                true
            }
            _ => false,
        }
    }

    /// True when at least one seat is occupied and every occupied seat is ready.
    pub fn all_ready(&self) -> bool {
        let mut occupied = self.slots.iter().filter(|s| s.is_occupied()).peekable();
        occupied.peek().is_some() && occupied.all(|s| s.ready)
    }

    pub fn slot_infos(&self) -> Vec<SlotInfo> {
        self.slots.iter().map(LobbySlot::info).collect()
    }

    pub fn lobby_data(&self) -> LobbyData {
        let heroes = self
            .slots
            .iter()
            .filter(|s| s.is_occupied())
            .map(|s| {
                let peer_id = s.peer_id.clone().unwrap_or_else(|| HOST_PEER_ID.to_string());
                (peer_id, hero_key(s.hero_index))
            })
            .collect();

        LobbyData {
            heroes,
            map_id: self.map_id.clone(),
        }
    }

    /// Locks the lobby and returns the start payload, or `None` while
    /// someone is still choosing.
    pub fn start(&mut self) -> Option<LobbyData> {
        if self.started || !self.all_ready() {
            return None;
        }
        self.started = true;
        Some(self.lobby_data())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_first_join_gets_peer_one() {
        let mut lobby = Lobby::hosted(5);
        assert_eq!(lobby.join(PROTOCOL_VERSION, "X"), Ok("peer:1".to_string()));

        let slot = lobby.slot_of("peer:1").unwrap();
        assert_eq!(slot.index, 1);
        assert_eq!(slot.name, "X");
        assert!(!slot.ready);
    }

    #[test]
    fn test_full_lobby_denies() {
        let mut lobby = Lobby::new(5);
        for _ in 0..5 {
            lobby.join(PROTOCOL_VERSION, "").unwrap();
        }

        assert_eq!(lobby.join(PROTOCOL_VERSION, "late"), Err(DenyReason::Full));
        assert_eq!(lobby.slot_count(), 5);
        assert_eq!(lobby.occupied_count(), 5);
    }

    #[test]
    fn test_protocol_mismatch_checked_first() {
        let mut lobby = Lobby::new(0);
        assert_eq!(
            lobby.join(PROTOCOL_VERSION + 1, "X"),
            Err(DenyReason::ProtocolMismatch)
        );
    }

    #[test]
    fn test_peer_ids_unique_and_reused_after_leave() {
        let mut lobby = Lobby::hosted(5);
        let a = lobby.join(PROTOCOL_VERSION, "a").unwrap();
        let b = lobby.join(PROTOCOL_VERSION, "b").unwrap();
        assert_ne!(a, b);

        assert!(lobby.remove_peer(&a));
        assert!(!lobby.remove_peer(&a));
        assert_eq!(lobby.join(PROTOCOL_VERSION, "c"), Ok(a.clone()));

        let ids: Vec<&str> = lobby
            .slots()
            .iter()
            .filter_map(|s| s.peer_id.as_deref())
            .collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_host_seat_cannot_be_removed() {
        let mut lobby = Lobby::hosted(5);
        assert!(!lobby.remove_peer(HOST_PEER_ID));
        assert!(lobby.slots()[0].is_occupied());
    }

    #[test]
    fn test_update_wraps_hero_index() {
        let mut lobby = Lobby::hosted(5);
        let peer = lobby.join(PROTOCOL_VERSION, "X").unwrap();

        assert!(lobby.apply_update(&peer, Some(7), None));
        assert_eq!(lobby.slot_of(&peer).unwrap().hero_index, 2);
        assert!(!lobby.apply_update("peer:9", None, Some(true)));
    }

    #[test]
    fn test_start_requires_everyone_ready() {
        let mut empty = Lobby::new(5);
        assert!(!empty.all_ready());
        assert!(empty.start().is_none());

        let mut lobby = Lobby::hosted(5);
        let peer = lobby.join(PROTOCOL_VERSION, "X").unwrap();
        lobby.apply_update(HOST_PEER_ID, Some(1), Some(true));
        assert!(lobby.start().is_none());

        lobby.apply_update(&peer, Some(3), Some(true));
        let data = lobby.start().unwrap();
        assert_eq!(data.map_id, DEFAULT_MAP_ID);
        assert_eq!(data.heroes[HOST_PEER_ID], "hero.knight_green");
        assert_eq!(data.heroes[&peer], "hero.knight_yellow");

        assert!(lobby.start().is_none());
        assert_eq!(lobby.join(PROTOCOL_VERSION, "late"), Err(DenyReason::InProgress));
    }

    #[test]
    fn test_mirrored_slot_marks_local() {
        let info = LobbySlot::open(2).info();
        assert!(!LobbySlot::from_info(&info, None).is_local);

        let mut lobby = Lobby::hosted(5);
        let peer = lobby.join(PROTOCOL_VERSION, "X").unwrap();
        let infos = lobby.slot_infos();
        let mirrored: Vec<LobbySlot> = infos
            .iter()
            .map(|i| LobbySlot::from_info(i, Some(&peer)))
            .collect();
        assert!(mirrored[1].is_local);
        assert!(!mirrored[0].is_local);
    }
}
