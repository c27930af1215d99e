//! Common test utilities and mock implementations
#![allow(dead_code)]


pub use mock_interface::{MockError, MockInterface, Operation};
pub use test_utils::{
    BASE, CTRL, FREQ_TGT, PWM_CMP, STAT, create_mock_motor, create_motor_on, ctrl_word, stat_word,
};
