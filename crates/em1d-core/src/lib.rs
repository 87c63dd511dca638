//! Layered-earth EM forward modelling and sensitivities.
//!
//! Single soundings: reflection, kernel, frequency, waveform, time_domain, simulation
//! Survey level: layers, mapping, dispatch, global
//! Verification: jacobian

pub mod dispatch;
pub mod frequency;
pub mod global;
pub mod jacobian;
pub mod kernel;
pub mod layers;
pub mod mapping;
pub mod reflection;
pub mod simulation;
pub mod time_domain;
pub mod waveform;

pub use global::{DataIndex, GlobalEm1d, ModelCache, Sensitivity};
pub use mapping::{ConductivityMap, ExpMap, IdentityMap};
pub use simulation::{simulate, FilterSet, SimulationMode, SoundingInput, SoundingOutput};
