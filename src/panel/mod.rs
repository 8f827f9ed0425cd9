//! Panel hardware access: the bus abstraction, the 7in3f command set, the
//! protocol state machine and a simulated bus.

pub mod bus;
pub mod commands;
pub mod driver;
pub mod simulated;

pub use bus::{BoxedBus, BusError, Dc, PanelBus};
pub use commands::PanelTiming;
pub use driver::{PanelDriver, PanelError, PanelState};
pub use simulated::{BusEvent, BusyTrigger, Failure, SimulatedPanel, SimulatedPanelLog};
