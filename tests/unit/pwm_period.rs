//! Unit tests for PWM period and prescaler control

use crate::common::{BASE, CTRL, MockError, MockInterface, PWM_CMP, create_mock_motor, ctrl_word};
use bldcm::{CacheState, Error, Frequency, Motor, Parameter, Period, RegisterName, TimeUnit};

fn max_count(interface: &MockInterface) -> u32 {
    (interface.get_register(CTRL) >> 12) & 0xFFFF
}

fn prescaler(interface: &MockInterface) -> u32 {
    (interface.get_register(CTRL) >> 6) & 0x3F
}

#[test]
fn test_period_to_max_count() {
    let (mut motor, interface) = create_mock_motor();

    motor.set_pwm_period(Period::nanos(20_000), 0).unwrap();
    assert_eq!(max_count(&interface), 500);
    assert_eq!(prescaler(&interface), 0);

    motor.set_pwm_period(Period::micros(100), 2).unwrap();
    assert_eq!(max_count(&interface), 625);
    assert_eq!(prescaler(&interface), 2);

    motor.set_pwm_period(Period::millis(10), 4).unwrap();
    assert_eq!(max_count(&interface), 15625);
    assert_eq!(prescaler(&interface), 4);
}

#[test]
fn test_period_with_slow_clock() {
    let interface = MockInterface::with_motor_at(BASE);
    let mut motor = Motor::new(interface.clone(), Frequency::khz(128), BASE).unwrap();

    motor.set_pwm_period(Period::secs(1), 0).unwrap();

    assert_eq!(max_count(&interface), 64000);
}

#[test]
fn test_period_read_back() {
    let (mut motor, _interface) = create_mock_motor();
    motor.set_pwm_period(Period::micros(20), 0).unwrap();

    let (period, prescaler) = motor.pwm_period(TimeUnit::Micros).unwrap();
    assert_eq!(period, Period::micros(20));
    assert_eq!(prescaler, 0);

    let (period, _) = motor.pwm_period(TimeUnit::Nanos).unwrap();
    assert_eq!(period, Period::nanos(20_000));
}

#[test]
fn test_period_round_trip_for_every_prescaler() {
    let (mut motor, interface) = create_mock_motor();

    for prescaler in 0..=32 {
        // One up/down counter tick at 50 MHz
        let step = 20u64 << (prescaler + 1);

        for count in [1u64, 500, 0xFFFF] {
            let period = Period::nanos(step * count);
            motor.set_pwm_period(period, prescaler).unwrap();

            assert_eq!(u64::from(max_count(&interface)), count);
            assert_eq!(
                motor.pwm_period(TimeUnit::Nanos).unwrap(),
                (period, u8::try_from(prescaler).unwrap()),
                "prescaler {prescaler}, count {count}"
            );
        }
    }
}

#[test]
fn test_period_read_back_truncates() {
    let (mut motor, interface) = create_mock_motor();
    // 625 ticks, prescaler 2 -> 100 us
    interface.set_register(CTRL, ctrl_word(625, 2, 0, false));

    let (period, prescaler) = motor.pwm_period(TimeUnit::Millis).unwrap();

    assert_eq!(period, Period::millis(0));
    assert_eq!(prescaler, 2);
}

#[test]
fn test_max_period() {
    let (motor, _interface) = create_mock_motor();

    // 0xFFFF * 2 / 50 MHz
    assert_eq!(motor.max_pwm_period_nanos(0).unwrap(), 2_621_400);
    assert_eq!(motor.max_pwm_period_nanos(1).unwrap(), 5_242_800);
    assert!(matches!(
        motor.max_pwm_period_nanos(33),
        Err(Error::OutOfRange(Parameter::Prescaler))
    ));
}

#[test]
fn test_period_above_maximum() {
    let (mut motor, interface) = create_mock_motor();
    interface.clear_operations();

    assert!(matches!(
        motor.set_pwm_period(Period::nanos(2_621_401), 0),
        Err(Error::OutOfRange(Parameter::PwmPeriod))
    ));
    assert!(interface.operations().is_empty());

    // The boundary itself is accepted
    motor.set_pwm_period(Period::nanos(2_621_400), 0).unwrap();
    assert_eq!(max_count(&interface), 0xFFFF);
}

#[test]
fn test_prescaler_out_of_range() {
    let (mut motor, interface) = create_mock_motor();
    interface.clear_operations();

    for prescaler in [33, -1] {
        assert!(matches!(
            motor.set_pwm_period(Period::micros(20), prescaler),
            Err(Error::OutOfRange(Parameter::Prescaler))
        ));
    }
    assert!(interface.operations().is_empty());
}

#[test]
fn test_largest_prescaler() {
    let (mut motor, interface) = create_mock_motor();

    motor.set_pwm_period(Period::secs(10_000_000), 32).unwrap();

    assert_eq!(prescaler(&interface), 32);
    assert_eq!(max_count(&interface), 58207);
}

#[test]
fn test_period_reapplies_duty() {
    let (mut motor, interface) = create_mock_motor();
    motor.set_pwm_duty(50).unwrap();

    motor.set_pwm_period(Period::micros(20), 0).unwrap();

    assert_eq!(interface.get_register(PWM_CMP), 250);
    assert_eq!(motor.pwm_duty().unwrap(), 50);
}

#[test]
fn test_period_is_one_control_write() {
    let (mut motor, interface) = create_mock_motor();
    interface.clear_operations();

    motor.set_pwm_period(Period::micros(20), 0).unwrap();

    assert_eq!(interface.writes_to(CTRL), vec![ctrl_word(500, 0, 0, false)]);
    assert_eq!(motor.registers().ctrl.state(), CacheState::Synced);
}

#[test]
fn test_period_preserves_other_control_fields() {
    let (mut motor, interface) = create_mock_motor();
    motor.set_output_enable(true).unwrap();
    motor.set_phase(3).unwrap();

    motor.set_pwm_period(Period::micros(100), 2).unwrap();

    assert_eq!(interface.get_register(CTRL), ctrl_word(625, 2, 3, true));
}

#[test]
fn test_period_refreshes_untouched_control_first() {
    let interface = MockInterface::with_motor_at(BASE);
    interface.set_register(CTRL, ctrl_word(1000, 1, 4, true));
    interface.fail_next_read_at(PWM_CMP);
    let mut motor = Motor::new(interface.clone(), Frequency::mhz(50), BASE).unwrap();
    assert_eq!(motor.registers().ctrl.state(), CacheState::Initialized);

    motor.set_pwm_period(Period::micros(20), 0).unwrap();

    assert_eq!(interface.writes_to(CTRL), vec![ctrl_word(500, 0, 4, true)]);
}

#[test]
fn test_period_rejected_while_control_is_modified() {
    let (mut motor, interface) = create_mock_motor();
    motor.registers_mut().ctrl.set_enable(1, true).unwrap();
    interface.clear_operations();

    assert!(matches!(
        motor.set_pwm_period(Period::micros(20), 0),
        Err(Error::InconsistentCacheState(RegisterName::Ctrl))
    ));
    assert!(matches!(
        motor.pwm_period(TimeUnit::Micros),
        Err(Error::InconsistentCacheState(RegisterName::Ctrl))
    ));
    assert!(interface.operations().is_empty());
}

#[test]
fn test_failed_period_flush_restores_cache() {
    let (mut motor, interface) = create_mock_motor();
    let cached = motor.registers().ctrl.cached();
    interface.fail_next_write();

    assert!(matches!(
        motor.set_pwm_period(Period::micros(20), 0),
        Err(Error::Bus(MockError::BusFault))
    ));

    assert_eq!(motor.registers().ctrl.state(), CacheState::Synced);
    assert_eq!(motor.registers().ctrl.cached(), cached);
    assert_eq!(interface.get_register(CTRL), 0x0FFF_F000);

    // The driver is still usable afterwards
    motor.set_pwm_period(Period::micros(20), 0).unwrap();
    assert_eq!(max_count(&interface), 500);
}
