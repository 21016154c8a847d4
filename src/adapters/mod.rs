//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                            |
//! |------------|--------------|----------------------------------------|
//! | `hardware` | HardwarePort | ESP32 ADC1, GPIO, LEDC, 1-Wire / sim   |
//! | `log_sink` | EventSink    | Serial log output                      |
//! | `time`     | ClockPort    | Local wall clock (chrono)              |

pub mod hardware;
pub mod log_sink;
pub mod time;
