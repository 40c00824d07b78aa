// SPDX-License-Identifier: Apache-2.0

use super::*;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Lr {
    #[default]
    Init,
    Left,
    Right,
    LeftLeft,
    LeftRight,
    RightLeft,
    RightRight,
}

impl Lr {
    event! {
        on_left(
            Init => Left,
            Left => LeftLeft,
            Right => RightLeft,
        );
        on_right(
            Init => Right,
            Left => LeftRight,
            Right => RightRight,
        );
    }
}

#[test]
fn lr_transitions() {
    let mut state = Lr::Init;
    state.on_left().unwrap();
    assert_eq!(state, Lr::Left);
    state.on_right().unwrap();
    assert_eq!(state, Lr::LeftRight);

    let mut state = Lr::Init;
    state.on_right().unwrap();
    assert_eq!(state, Lr::Right);

    state.on_left().unwrap();
    assert_eq!(state, Lr::RightLeft);
    assert!(matches!(
        state.on_left(),
        Err(Error::InvalidTransition { .. })
    ));
}

#[cfg(feature = "alloc")]
#[test]
fn lr_dot_test() {
    let dot = Lr::dot().to_string();
    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains("Init -> Left"));
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Microwave {
    #[default]
    Idle,
    OpenIdle,
    SettingTime,
    OpenSettingTime,
    Paused,
    OpenPaused,
    Running,
}

impl Microwave {
    event! {
        on_number(
            Idle | SettingTime => SettingTime,
            OpenSettingTime => OpenSettingTime,
        );
        on_cancel(
            Idle | SettingTime | Paused | Running => Idle,
            OpenIdle | OpenSettingTime | OpenPaused => OpenIdle,
        );
        on_start(
            SettingTime | Paused | Running => Running,
        );
        on_door_open(
            Idle => OpenIdle,
            SettingTime => OpenSettingTime,
            Paused | Running => OpenPaused,
        );
        on_door_close(
            OpenIdle => Idle,
            OpenSettingTime => SettingTime,
            OpenPaused => Paused,
        );
        on_time_finished(
            Running => Idle,
        );
    }
}

#[test]
fn microwave_transitions() {
    let mut state = Microwave::Idle;
    state.on_number().unwrap();
    assert_eq!(state, Microwave::SettingTime);
    state.on_start().unwrap();
    assert_eq!(state, Microwave::Running);
    state.on_door_open().unwrap();
    assert_eq!(state, Microwave::OpenPaused);
    state.on_door_close().unwrap();
    assert_eq!(state, Microwave::Paused);
    state.on_time_finished().unwrap_err();
    state.on_cancel().unwrap();
    assert_eq!(state, Microwave::Idle);
}

#[test]
fn no_op_when_already_in_target_state() {
    let mut state = Microwave::Idle;
    let err = state.on_time_finished().unwrap_err();
    assert!(matches!(err, Error::NoOp { .. }));
}
