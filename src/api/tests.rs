use super::*;

#[test]
fn test_get_version() {
    let result = get_version().unwrap();
    assert_eq!(result, "0.1.0");
}

#[test]
fn test_available_bpms() {
    assert_eq!(
        available_bpms(),
        vec![20, 40, 60, 80, 100, 120, 140, 160, 180]
    );
}

#[test]
fn test_tick_sounds_list_all_variants() {
    let names: Vec<String> = tick_sounds().into_iter().map(|info| info.name).collect();
    assert_eq!(names, vec!["classic", "digital", "soft", "wooden", "accent"]);
    assert_eq!(names, TickSoundType::ALL.map(|sound| sound.as_str()));
}

#[test]
fn test_speed_presets() {
    let presets = speed_presets();
    assert_eq!(presets.len(), 5);
    assert_eq!(presets[2].name, "medium");
    assert_eq!(presets[2].bpm, 80);
}

#[test]
fn test_validation_happens_before_engine_lookup() {
    assert_eq!(
        start_metronome(90, "classic".to_string()),
        Err(TempoError::BpmInvalid { bpm: 90 })
    );
    assert!(matches!(
        start_metronome(60, "cowbell".to_string()),
        Err(TempoError::SoundTypeInvalid { .. })
    ));
    assert_eq!(set_bpm(0), Err(TempoError::BpmInvalid { bpm: 0 }));
}

#[test]
fn test_render_and_inspect() {
    let samples = render_tick_sound("Digital".to_string()).unwrap();
    assert_eq!(samples.len(), 2205);

    let report = inspect_tick_sound("digital".to_string()).unwrap();
    assert_eq!(report.sample_count, 2205);
}

#[test]
fn test_export_writes_file() {
    let path = export_tick_sound("soft".to_string()).unwrap();
    assert!(std::path::Path::new(&path).exists());
    let _ = std::fs::remove_file(path);
}
