mod common;

use common::{config, load, rec, Event, MockHost, ProgramImage};
use pretty_assertions::assert_eq;
use rtim_script::vm::opcode::Opcode;
use rtim_script::{DiagnosticKind, HostOpcodeTable, Sequencer, StepResult};

fn op(o: Opcode) -> u8 {
    o as u8
}

fn table() -> HostOpcodeTable<MockHost> {
    let mut table: HostOpcodeTable<MockHost> = HostOpcodeTable::new();
    table.register(0, |host, _ctx, params| {
        host.events.push(Event::Host(params.to_vec()));
        5
    });
    table.register(1, |_host, _ctx, _params| -1);
    table.register(2, |_host, _ctx, _params| -2);
    table.register(3, |host, ctx, params| {
        let label = ctx.text(params[0]).map(|s| s.into_owned()).unwrap_or_default();
        host.events.push(Event::Text(label, ctx.function() as u16));
        ctx.start_function(params[1] as usize);
        0
    });
    table.register(4, |_host, ctx, _params| {
        ctx.stop_function(ctx.function());
        0
    });
    table.register(5, |_host, ctx, _params| {
        let me = ctx.function();
        ctx.stop_function(me);
        ctx.start_function(me);
        0
    });
    table.register(6, |_host, ctx, _params| {
        let me = ctx.function();
        ctx.start_function(me);
        ctx.stop_function(me);
        0
    });
    table
}

fn host_sequencer(image: &ProgramImage) -> Sequencer<MockHost> {
    Sequencer::new(load(image), &config(1)).with_host_opcodes(table())
}

#[test]
fn params_are_forwarded_and_result_kept() {
    let image = ProgramImage::new().function(
        0,
        vec![
            rec(0, op(Opcode::ExecOpcode), &[0, 7, 8, 9]),
            rec(10, op(Opcode::EndBurst), &[]),
        ],
    );
    let mut seq = host_sequencer(&image);
    let mut host = MockHost::new();

    assert_eq!(seq.step(&mut host, 0), StepResult::Running);
    assert_eq!(host.events, vec![Event::Host(vec![7, 8, 9])]);
    assert_eq!(seq.last_host_result(), 5);
}

#[test]
fn minus_one_stops_the_program() {
    let image = ProgramImage::new().function(
        0,
        vec![
            rec(0, op(Opcode::ExecOpcode), &[1]),
            rec(0, op(Opcode::ExecOpcode), &[0]),
        ],
    );
    let mut seq = host_sequencer(&image);
    let mut host = MockHost::new();

    assert_eq!(seq.step(&mut host, 0), StepResult::Finished);
    assert!(host.events.is_empty());
    assert_eq!(seq.last_host_result(), -1);
}

#[test]
fn minus_two_yields_after_advancing() {
    let image = ProgramImage::new().function(
        0,
        vec![
            rec(2, op(Opcode::ExecOpcode), &[2]),
            rec(0, op(Opcode::ExecOpcode), &[0, 1]),
            rec(0, op(Opcode::StopCurFunc), &[]),
        ],
    );
    let mut seq = host_sequencer(&image);
    let mut host = MockHost::new();

    seq.step(&mut host, 0);
    let f0 = seq.function(0).unwrap();
    assert_eq!(f0.ip(), Some(image.offset_of(0, 1)));
    assert_eq!(f0.next_time(), 32);
    assert!(host.events.is_empty());

    assert_eq!(seq.step(&mut host, 32), StepResult::Finished);
    assert_eq!(host.events, vec![Event::Host(vec![1])]);
}

#[test]
fn requests_start_functions_after_the_call() {
    let image = ProgramImage::new()
        .text(&["from host", "from func 5"])
        .function(
            0,
            vec![
                rec(0, op(Opcode::ExecOpcode), &[3, 0, 5]),
                rec(10, op(Opcode::EndBurst), &[]),
            ],
        )
        .function(5, vec![rec(0, op(Opcode::DisplayText), &[1, 0]), rec(0, op(Opcode::StopCurFunc), &[])]);
    let mut seq = host_sequencer(&image);
    let mut host = MockHost::new();

    seq.step(&mut host, 0);
    assert_eq!(
        host.events,
        vec![
            Event::Text("from host".into(), 0),
            Event::Text("from func 5".into(), 0),
        ]
    );
}

#[test]
fn stopping_the_caller_from_a_request() {
    let image = ProgramImage::new()
        .function(
            0,
            vec![
                rec(0, op(Opcode::InitFunc), &[1]),
                rec(10, op(Opcode::EndBurst), &[]),
            ],
        )
        .function(
            1,
            vec![
                rec(0, op(Opcode::ExecOpcode), &[4]),
                rec(0, op(Opcode::ExecOpcode), &[0]),
            ],
        );
    let mut seq = host_sequencer(&image);
    let mut host = MockHost::new();

    seq.step(&mut host, 0);
    assert!(!seq.function(1).unwrap().is_running());
    assert!(host.events.is_empty());
}

#[test]
fn last_request_for_the_caller_wins() {
    let image = ProgramImage::new()
        .function(
            0,
            vec![
                rec(0, op(Opcode::InitFunc), &[1]),
                rec(0, op(Opcode::InitFunc), &[2]),
                rec(100, op(Opcode::EndBurst), &[]),
            ],
        )
        .function(
            1,
            vec![
                rec(10, op(Opcode::EndBurst), &[]),
                rec(0, op(Opcode::ExecOpcode), &[5]),
            ],
        )
        .function(
            2,
            vec![
                rec(10, op(Opcode::EndBurst), &[]),
                rec(0, op(Opcode::ExecOpcode), &[6]),
            ],
        );
    let mut seq = host_sequencer(&image);
    let mut host = MockHost::new();

    seq.step(&mut host, 0);
    seq.step(&mut host, 160);

    // stop then start: restarted at its entry and run again this step
    let f1 = seq.function(1).unwrap();
    assert!(f1.is_running());
    assert_eq!(f1.ip(), Some(image.offset_of(1, 1)));
    assert_eq!(f1.next_time(), 320);

    // start then stop: stays stopped
    assert!(!seq.function(2).unwrap().is_running());
    assert!(seq.diagnostics().is_empty());
}

#[test]
fn missing_entries_are_diagnosed() {
    let image = ProgramImage::new().function(
        0,
        vec![
            rec(0, op(Opcode::ExecOpcode), &[40]),
            rec(0, op(Opcode::StopCurFunc), &[]),
        ],
    );

    let mut seq = host_sequencer(&image);
    assert_eq!(seq.step(&mut MockHost::new(), 0), StepResult::Finished);
    assert_eq!(seq.diagnostics().count(DiagnosticKind::HostOpcode), 1);

    // no table at all
    let mut bare: Sequencer<MockHost> = Sequencer::new(load(&image), &config(1));
    assert_eq!(bare.step(&mut MockHost::new(), 0), StepResult::Finished);
    assert_eq!(bare.diagnostics().count(DiagnosticKind::HostOpcode), 1);
}
