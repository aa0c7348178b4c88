//! End-to-end tests for the AVR stack analyzer
//!
//! These tests drive the complete workflow:
//! 1. Assemble source into a firmware image
//! 2. Emit the image as Intel HEX text
//! 3. Parse and load the HEX text
//! 4. Analyze worst-case stack usage

use avr_assembler::assemble;
use avr_spec::{HexFile, Instruction, Record};
use avr_stack::{
    analyze_hex, AnalysisConfig, AnalysisError, StackAnalysis, StackUsage, UnboundedReason,
};

fn hex_text(source: &str) -> String {
    assemble(source).expect("Assembly failed").to_hex().to_string()
}

fn stack_usage(source: &str) -> StackUsage {
    analyze_hex(&hex_text(source), AnalysisConfig::default())
        .expect("Analysis failed")
        .usage
}

// ============================================================================
// Reference fixtures
// ============================================================================

#[test]
fn test_one_push_no_pop() {
    assert_eq!(stack_usage("push r16"), StackUsage::Bounded(1));
}

#[test]
fn test_call_into_subroutine() {
    let source = r#"
        call sub
    halt:
        rjmp halt
    sub:
        push r16
        push r17
        ret
    "#;
    assert_eq!(stack_usage(source), StackUsage::Bounded(4));
}

#[test]
fn test_self_jump() {
    assert_eq!(stack_usage("rjmp .-2"), StackUsage::Bounded(0));
}

#[test]
fn test_reti_faults() {
    let err = analyze_hex(&hex_text("reti"), AnalysisConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::UnsupportedInstruction { pc: 0, instruction: Instruction::Reti }
    ));
}

#[test]
fn test_indirect_jump_gap() {
    let report = analyze_hex(&hex_text("ijmp"), AnalysisConfig::default()).unwrap();
    assert_eq!(report.usage, StackUsage::Bounded(0));
    assert_eq!(report.gaps.len(), 1);
    assert_eq!(report.gaps[0].instruction, Instruction::Ijmp);
}

#[test]
fn test_push_in_backward_loop() {
    let source = r#"
    again:
        push r16
        nop
        rjmp again
    "#;
    assert_eq!(stack_usage(source), StackUsage::Unbounded);
}

#[test]
fn test_self_recursive_subroutine() {
    let source = r#"
        call fact
    halt:
        rjmp halt
    fact:
        push r24
        dec r24
        breq done
        call fact
    done:
        pop r24
        ret
    "#;
    let report = analyze_hex(&hex_text(source), AnalysisConfig::default()).unwrap();
    assert_eq!(report.usage, StackUsage::Unbounded);
    assert!(matches!(report.unbounded, Some(UnboundedReason::GrowingCycle { .. })));
}

// ============================================================================
// Image loading
// ============================================================================

#[test]
fn test_hex_with_extended_linear_address() {
    // 64 KiB of NOPs followed by push/ret above the 16-bit boundary
    let mut image = vec![0u8; 0x10000];
    image.extend_from_slice(&[0x0F, 0x93, 0x08, 0x95]);
    let hex = HexFile::from_image(&image);
    assert!(hex
        .records()
        .iter()
        .any(|r| *r == Record::ExtendedLinearAddress(1)));

    let text = hex.to_string();
    let report = analyze_hex(&text, AnalysisConfig::default()).unwrap();
    assert_eq!(report.usage, StackUsage::Bounded(1));
}

#[test]
fn test_hex_segments_out_of_order() {
    // ret at word 2, entry code at word 0 jumps over a zero-filled hole
    let text = "\
:0200040008955D
:0200000001C03D
:00000001FF
";
    let report = analyze_hex(text, AnalysisConfig::default()).unwrap();
    assert_eq!(report.usage, StackUsage::Bounded(0));
    assert!(report.is_complete());
}

#[test]
fn test_bad_checksum_is_reported() {
    let err = analyze_hex(":0200000008958A\n:00000001FF\n", AnalysisConfig::default())
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Image(_)));
    assert!(err.to_string().contains("Checksum mismatch at line 1"));
}

#[test]
fn test_reuse_analysis_across_configs() {
    let source = "call sub\nhalt: rjmp halt\nsub: ret";
    let analysis = StackAnalysis::from_hex(&assemble(source).unwrap().to_hex());
    assert_eq!(analysis.apply().unwrap(), StackUsage::Bounded(2));

    let analysis = analysis.with_config(AnalysisConfig::default().with_return_address_bytes(3));
    assert_eq!(analysis.apply().unwrap(), StackUsage::Bounded(3));
    assert_eq!(analysis.apply().unwrap(), StackUsage::Bounded(3));
}
