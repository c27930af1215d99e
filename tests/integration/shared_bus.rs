//! Several motors sharing one bus handle

use crate::common::{BASE, CTRL, MockInterface, PWM_CMP, ctrl_word};
use bldcm::{Frequency, Motor, Period};

const SECOND: u32 = BASE + 0x100;

#[test]
fn test_two_motors_on_borrowed_bus() {
    let interface = MockInterface::with_motor_at(BASE);
    interface.add_motor_at(SECOND);

    let mut first = Motor::new(&interface, Frequency::mhz(50), BASE).unwrap();
    let mut second = Motor::new(&interface, Frequency::mhz(100), SECOND).unwrap();

    first.set_pwm_period(Period::micros(20), 0).unwrap();
    second.set_pwm_period(Period::micros(20), 0).unwrap();
    first.set_phase(2).unwrap();

    assert_eq!(interface.get_register(CTRL), ctrl_word(500, 0, 2, false));
    assert_eq!(
        interface.get_register(SECOND + 0x08),
        ctrl_word(1000, 0, 0, false)
    );
    assert_eq!(second.phase().unwrap(), 0);
}

#[test]
fn test_cloned_handles_share_state() {
    let interface = MockInterface::with_motor_at(BASE);
    interface.add_motor_at(SECOND);

    let mut first = Motor::new(interface.clone(), Frequency::mhz(50), BASE).unwrap();
    let mut second = Motor::new(interface.clone(), Frequency::mhz(50), SECOND).unwrap();

    first.set_pwm_duty(100).unwrap();
    second.set_pwm_duty(0).unwrap();

    assert_eq!(interface.get_register(PWM_CMP), 0x1_0000);
    assert_eq!(interface.get_register(SECOND + 0x04), 0);

    // Dropping one motor leaves the bus usable for the other
    drop(first);
    assert_eq!(second.pwm_duty().unwrap(), 0);
}

#[cfg(feature = "alloc")]
#[test]
fn test_motors_on_reference_counted_bus() {
    use std::rc::Rc;

    let interface = Rc::new(MockInterface::with_motor_at(BASE));
    interface.add_motor_at(SECOND);

    let mut first = Motor::new(Rc::clone(&interface), Frequency::mhz(50), BASE).unwrap();
    let second = Motor::new(Rc::clone(&interface), Frequency::mhz(50), SECOND).unwrap();

    first.set_phase(4).unwrap();
    drop(second);

    assert_eq!(interface.get_register(CTRL), ctrl_word(0xFFFF, 0, 4, false));
    let before = Rc::strong_count(&interface);
    let bus = first.release();
    assert_eq!(Rc::strong_count(&interface), before - 4);
    drop(bus);
    assert_eq!(Rc::strong_count(&interface), 1);
}
