pub mod registry;
pub mod state;
pub mod types;
pub mod value;

pub use registry::{
    ElementName, ElementNameRegistry, Group, RegistryError, Variable, VariableMapping,
    VariableRegistry,
};
pub use state::{Agent, ElementView, SceneElement, SystemState};
pub use types::Type;
pub use value::Value;
