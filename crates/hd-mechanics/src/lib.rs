//! Heroic dice engine.
//!
//! Takes an already-evaluated roll, rolls a pool of heroic dice, and
//! distributes them over the roll's target dice to raise or lower the kept
//! result. It honors keep-highest/keep-lowest rules per die or per pool
//! group and resolves any explosions the heroic dice trigger.
//!
//! The pipeline is [`RollAnalyzer`] → [`HeroDiceAllocator`] →
//! [`ExplosiveDie::apply_heroic`], driven end to end by [`HeroDiceEngine`].

pub mod actor;
pub mod allocator;
pub mod config;
pub mod dice;
pub mod engine;
pub mod error;
pub mod keep;
pub mod roll;

pub use actor::{ActorResourceHandle, InMemoryActor};
pub use allocator::{Allocation, AllocationMode, HeroDiceAllocator};
pub use config::EngineConfig;
pub use dice::{DiceRoller, ExplosiveDie, HeroicDieResult, RngRoller, ScriptedRoller};
pub use engine::{HeroDiceEngine, HeroRequest, HeroRollOutcome};
pub use error::{MechError, MechResult};
pub use keep::{KeepKind, KeepRule, KeepScope};
pub use roll::{Decomposition, DiceTerm, DieRoll, Operator, PoolTerm, Roll, RollAnalyzer, RollTerm};
