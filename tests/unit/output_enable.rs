//! Unit tests for output enable control

use crate::common::{CTRL, create_mock_motor, ctrl_word};
use bldcm::{CacheState, Error, RegisterName};

#[test]
fn test_output_enable_round_trip() {
    let (mut motor, interface) = create_mock_motor();

    motor.set_output_enable(true).unwrap();
    assert!(motor.output_enable().unwrap());
    assert_eq!(interface.get_register(CTRL) & 1, 1);

    motor.set_output_enable(false).unwrap();
    assert!(!motor.output_enable().unwrap());
    assert_eq!(interface.get_register(CTRL) & 1, 0);
}

#[test]
fn test_output_enable_touches_only_enable_bit() {
    let (mut motor, interface) = create_mock_motor();
    interface.set_register(CTRL, ctrl_word(42, 3, 2, false));

    motor.set_output_enable(true).unwrap();

    assert_eq!(interface.get_register(CTRL), ctrl_word(42, 3, 2, true));
}

#[test]
fn test_output_enable_reads_hardware() {
    let (mut motor, interface) = create_mock_motor();
    interface.set_register(CTRL, ctrl_word(0xFFFF, 0, 0, true));
    interface.clear_operations();

    assert!(motor.output_enable().unwrap());
    assert_eq!(interface.read_count(CTRL), 1);
}

// The getter reports `false` instead of failing on a modified cache, even
// though hardware has the output enabled.
#[test]
fn test_output_enable_reports_false_while_control_is_modified() {
    let (mut motor, interface) = create_mock_motor();
    interface.set_register(CTRL, ctrl_word(0xFFFF, 0, 0, true));
    motor.registers_mut().ctrl.set_phase(1, true).unwrap();
    interface.clear_operations();

    assert!(!motor.output_enable().unwrap());
    assert_eq!(interface.read_count(CTRL), 0);
    assert_eq!(motor.registers().ctrl.state(), CacheState::Modified);
}

#[test]
fn test_set_output_enable_rejected_while_control_is_modified() {
    let (mut motor, interface) = create_mock_motor();
    motor.registers_mut().ctrl.set_phase(1, true).unwrap();
    interface.clear_operations();

    assert!(matches!(
        motor.set_output_enable(true),
        Err(Error::InconsistentCacheState(RegisterName::Ctrl))
    ));
    assert!(interface.operations().is_empty());
}

#[test]
fn test_output_enable_after_pending_writes_flushed() {
    let (mut motor, interface) = create_mock_motor();
    motor.registers_mut().ctrl.set_phase(1, true).unwrap();
    motor.registers_mut().ctrl.flush().unwrap();

    motor.set_output_enable(true).unwrap();

    assert!(motor.output_enable().unwrap());
    assert_eq!(interface.get_register(CTRL), ctrl_word(0xFFFF, 0, 1, true));
}
