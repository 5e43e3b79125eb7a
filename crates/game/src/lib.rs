pub mod lobby;
pub mod net;
pub mod simulation;
pub mod smoothing;
pub mod snapshot;
pub mod world;

pub use lobby::{ClientLobby, HostLobby, JoinState, Lobby, LobbyEvent, LobbySlot};
pub use net::{
    ClientSocket, DEFAULT_PORT, DEFAULT_TICK_RATE, DISCOVERY_PORT, DenyReason, HostSocket,
    LobbyData, MAX_PLAYERS, Message, NetConfig, NetContext, NetError, NetIdentity, NetStats,
    PROTOCOL_VERSION, Role,
};
pub use simulation::{FixedTimestep, SimulationLoop};
pub use smoothing::SmoothingSystem;
pub use snapshot::{
    ApplyOptions, ApplyReport, EnemySnapshot, PickupSnapshot, PlayerSnapshot, SnapshotApplier,
    WorldSnapshot, apply_world_snapshot, build_world_snapshot,
};
pub use world::{ComponentKind, ComponentSet, EntityId, System, World};
