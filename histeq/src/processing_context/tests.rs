use crate::config::{BackendPreference, EqualizeConfig};
use crate::prelude::*;
use crate::processing_context::ProcessingContext;

#[test]
fn test_cpu_only_context() {
    let ctx = ProcessingContext::cpu_only();
    assert!(!ctx.has_gpu());
    assert!(ctx.gpu().is_none());
    assert!(ctx.device_description().starts_with("Host, CPU"));
}

#[test]
fn test_cpu_preference_never_opens_gpu() {
    let config = EqualizeConfig {
        backend: BackendPreference::Cpu,
        threads: Some(2),
        ..Default::default()
    };
    let ctx = ProcessingContext::from_config(&config).unwrap();
    assert!(!ctx.has_gpu());
    assert_eq!(ctx.cpu().threads(), 2);
}

#[test]
fn test_auto_preference_falls_back_on_missing_device() {
    let config = EqualizeConfig {
        backend: BackendPreference::Auto,
        platform: Some(usize::MAX),
        ..Default::default()
    };
    let ctx = ProcessingContext::from_config(&config).unwrap();
    assert!(!ctx.has_gpu());
}

#[test]
fn test_gpu_preference_reports_missing_device() {
    let config = EqualizeConfig {
        backend: BackendPreference::Gpu,
        platform: Some(usize::MAX),
        ..Default::default()
    };
    let err = ProcessingContext::from_config(&config).unwrap_err();
    assert!(matches!(err, Error::DeviceUnavailable(_)));
}

#[test]
fn test_pipeline_is_cached() {
    let mut ctx = ProcessingContext::new();
    if !ctx.has_gpu() {
        return;
    }

    let plane = IntensityPlane::filled(4, 4, 9).unwrap();
    let op = HistogramEqualization::new(BinCount::FULL);
    op.execute_gpu(&mut ctx, &plane).unwrap();
    op.execute_gpu(&mut ctx, &plane).unwrap();

    let gpu_context = ctx.gpu_context().unwrap();
    assert_eq!(gpu_context.pipeline_count(), 1);
}
