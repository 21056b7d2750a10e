#![allow(unused_imports)]
use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "defmt")] {
        pub(crate) use defmt::{debug, warn, error};
    } else if #[cfg(feature = "log")] {
        pub(crate) use log::{debug, warn, error};
    }
}
