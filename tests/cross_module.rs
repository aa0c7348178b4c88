//! Cross-module interaction tests
//!
//! Tests the integration between assembler, disassembler, and analyzer.

use avr_assembler::assemble;
use avr_disassembler::{decode_at, format};
use avr_spec::{Flow, HexFile, Instruction, ProgramMemory, Target};
use avr_stack::{AnalysisConfig, FirmwareMemory, StackAnalysis, StackUsage};

// ============================================================================
// Assembler -> Disassembler -> Analyzer
// ============================================================================

#[test]
fn test_assembled_image_decodes_with_expected_flows() {
    let source = r#"
        breq skip
        sbis 0x10, 3
        call far
    skip:
        rcall near
        ijmp
    near:
        push r0
        pop r0
        ret
    far:
        sts 0x0200, r1
        reti
    "#;
    let image = assemble(source).unwrap();
    let memory = FirmwareMemory::from_bytes(image.bytes());

    let mut flows = Vec::new();
    let mut pc = 0;
    while !memory.is_past_end(pc) {
        let instr = decode_at(&memory, pc).unwrap();
        flows.push(instr.flow());
        pc += instr.width();
    }

    assert_eq!(
        flows,
        vec![
            Flow::Branch { offset: 3 },
            Flow::Skip,
            Flow::Call(Target::Absolute(image.label("far").unwrap())),
            Flow::Call(Target::Relative(1)),
            Flow::Jump(Target::Unresolved),
            Flow::Push,
            Flow::Pop,
            Flow::Return,
            Flow::WideStore,
            Flow::ReturnFromInterrupt,
        ]
    );
}

#[test]
fn test_gap_instruction_matches_disassembly() {
    let image = assemble("push r1\nicall\nret").unwrap();
    let memory = FirmwareMemory::from_bytes(image.bytes());
    let report = StackAnalysis::new(memory.clone(), AnalysisConfig::default())
        .analyze()
        .unwrap();

    let gap = report.gaps[0];
    assert_eq!(gap.instruction, decode_at(&memory, gap.pc).unwrap());
    assert_eq!(format(&gap.instruction), "icall");
}

#[test]
fn test_hex_text_and_bytes_agree() {
    let source = r#"
        push r28
        push r29
        rcall sub
        pop r29
        pop r28
        ret
    sub:
        push r16
        pop r16
        ret
    "#;
    let image = assemble(source).unwrap();

    let from_bytes = StackAnalysis::new(FirmwareMemory::from_bytes(image.bytes()), AnalysisConfig::default());
    let parsed: HexFile = image.to_hex().to_string().parse().unwrap();
    let from_hex = StackAnalysis::from_hex(&parsed);

    assert_eq!(from_bytes.memory(), from_hex.memory());
    assert_eq!(from_bytes.analyze().unwrap(), from_hex.analyze().unwrap());
    assert_eq!(from_hex.apply().unwrap(), StackUsage::Bounded(5));
}

#[test]
fn test_word_directive_feeds_analyzer() {
    // 0x930F = push r16, 0x9508 = ret
    let image = assemble(".word 0x930F, 0x9508").unwrap();
    let memory = FirmwareMemory::from_bytes(image.bytes());
    assert_eq!(
        decode_at(&memory, 0).unwrap(),
        Instruction::Push { r: avr_spec::Register::R16 }
    );
    let analysis = StackAnalysis::new(memory, AnalysisConfig::default());
    assert_eq!(analysis.apply().unwrap(), StackUsage::Bounded(1));
}
