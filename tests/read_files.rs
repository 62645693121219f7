//! End-to-end detection and decoding of synthetic files on disk.

mod common;

use chrono::{Datelike, Timelike};
use datalogger_rs::{
    BaykalVersion, DETECTION_ORDER, DataloggerError, FormatVariant, Probe, SampleWidth, Samples,
    baykal, identify, read, sdas, smart24, symres,
};
use tempfile::TempDir;

#[test]
fn test_identify_each_format() {
    let dir = TempDir::new().unwrap();
    let sdas_path = common::write(&dir, "a.sdas", &common::sdas(&["SHZ"], 4, 2));
    let s24_path = common::write(&dir, "b.s24", &common::smart24(&["BHZ"], 1));
    let xx_path = common::write(&dir, "c.xx", &common::baykal_v53(&["Z"], 3));
    let out_path = common::symres(&dir, "d.out", 4, true);

    assert_eq!(identify(&sdas_path).unwrap(), FormatVariant::Sdas);
    assert_eq!(identify(&s24_path).unwrap(), FormatVariant::Smart24);
    assert_eq!(
        identify(&xx_path).unwrap(),
        FormatVariant::Baykal(BaykalVersion::V53)
    );
    assert_eq!(identify(&out_path).unwrap(), FormatVariant::Symres);
}

#[test]
fn test_detection_is_exclusive() {
    let dir = TempDir::new().unwrap();
    let files = [
        common::write(&dir, "a.sdas", &common::sdas(&["SHZ"], 4, 2)),
        common::write(&dir, "b.s24", &common::smart24(&["BHZ"], 1)),
        common::write(&dir, "c.xx", &common::baykal_v53(&["Z"], 3)),
    ];
    for path in &files {
        let claims: Vec<_> = DETECTION_ORDER
            .iter()
            .filter(|v| v.probe(path).unwrap().is_match())
            .collect();
        assert_eq!(claims.len(), 1, "{} claimed by {claims:?}", path.display());
    }
}

#[test]
fn test_unrecognized_file() {
    let dir = TempDir::new().unwrap();
    let path = common::write(&dir, "noise.bin", &[0x5a; 300]);
    assert!(matches!(identify(&path), Err(DataloggerError::UnrecognizedFormat)));
    assert!(!sdas::detect(&path).unwrap());
    assert!(!smart24::detect(&path).unwrap());
    assert!(!baykal::detect(&path).unwrap());
    assert!(!symres::detect(&path).unwrap());
}

#[test]
fn test_detect_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.xx");
    assert!(matches!(baykal::detect(&path), Err(DataloggerError::Io(_))));
}

#[test]
fn test_read_sdas() {
    let dir = TempDir::new().unwrap();
    let path = common::write(&dir, "a.sdas", &common::sdas(&["SHZ", "SHN", "SHE"], 4, 3));
    let traces = read(&path).unwrap();

    assert_eq!(traces.len(), 3);
    for (c, trace) in traces.iter().enumerate() {
        assert_eq!(trace.samples.width(), SampleWidth::Int32);
        assert_eq!(trace.samples.len(), 12);
        assert_eq!(trace.samples.to_i32()[4], (c * 1000 + 100) as i32);
    }
    assert_eq!(traces[2].id(), "YAK..SHE");
    let t = traces[0].start_time;
    assert_eq!((t.year(), t.month(), t.day(), t.hour()), (2016, 7, 14, 3));
    assert_eq!(t.timestamp_subsec_millis(), 250);
}

#[test]
fn test_read_smart24_frames_continue() {
    let dir = TempDir::new().unwrap();
    let path = common::write(&dir, "b.s24", &common::smart24(&["BHZ", "BHN"], 3));
    let traces = read(&path).unwrap();

    assert_eq!(traces.len(), 2);
    let z = &traces[0];
    assert_eq!(z.sample_rate, 2.0);
    assert_eq!(z.samples, Samples::Int32((0..360).collect()));
    assert_eq!(traces[1].samples.to_i32()[0], 10_000);
    assert_eq!(z.start_time.timestamp() % 86_400, 12 * 3600);
    let span = z.end_time() - z.start_time;
    assert_eq!(span.num_milliseconds(), 359 * 500);
}

#[test]
fn test_smart24_segmented_file() {
    let dir = TempDir::new().unwrap();
    let mut data = common::smart24_header(&["BHZ"], b"FILE_SEG");
    data.extend(common::smart24_subframe("BHZ", &[1, 2]));
    let path = common::write(&dir, "seg.s24", &data);

    assert!(matches!(smart24::probe(&path).unwrap(), Probe::Unsupported(_)));
    assert!(matches!(
        smart24::detect(&path),
        Err(DataloggerError::UnsupportedFeature(_))
    ));
    assert!(matches!(
        identify(&path),
        Err(DataloggerError::UnsupportedFeature(_))
    ));
}

#[test]
fn test_read_baykal() {
    let dir = TempDir::new().unwrap();
    let path = common::write(&dir, "c.xx", &common::baykal_v53(&["N", "E", "Z"], 5));
    let traces = read(&path).unwrap();

    assert_eq!(traces.len(), 3);
    assert!(traces.iter().all(|t| t.samples.len() == 5));
    assert!((traces[0].sample_rate - 50.0).abs() < 1e-9);
    assert_eq!(traces[2].samples.to_i32(), vec![-3, 7, 17, 27, 37]);
    let t = traces[0].start_time;
    assert_eq!((t.year(), t.month(), t.day()), (2019, 3, 1));
    assert_eq!((t.hour(), t.minute(), t.second()), (0, 1, 0));
}

#[test]
fn test_baykal_v60_recognized_not_decoded() {
    let dir = TempDir::new().unwrap();
    let path = common::write(&dir, "new.xx", &common::baykal_general(60, 2));

    assert!(baykal::detect(&path).unwrap());
    assert_eq!(
        identify(&path).unwrap(),
        FormatVariant::Baykal(BaykalVersion::V60)
    );
    assert!(matches!(
        read(&path),
        Err(DataloggerError::UnsupportedVersion { version: 60, .. })
    ));
}

#[test]
fn test_read_symres() {
    let dir = TempDir::new().unwrap();
    let path = common::symres(&dir, "rec.OUT", 6, true);
    let traces = read(&path).unwrap();

    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0].id(), "SRX..HHZ");
    assert_eq!(traces[1].channel, "HHN");
    assert_eq!(traces[0].samples, Samples::Int32(vec![0, 1, 2, 3, 4, 5]));
    assert_eq!(traces[0].start_time.timestamp_millis(), 1_507_329_234_500);
}

#[test]
fn test_symres_without_companion() {
    let dir = TempDir::new().unwrap();
    let path = common::symres(&dir, "rec.out", 6, false);

    assert!(!symres::detect(&path).unwrap());
    assert!(matches!(identify(&path), Err(DataloggerError::UnrecognizedFormat)));
    assert!(matches!(
        symres::decode(&path),
        Err(DataloggerError::MissingCompanionFile(_))
    ));
}

#[test]
fn test_symres_custom_companion_name() {
    let dir = TempDir::new().unwrap();
    common::write(&dir, "station.txt", common::VDAQ.as_bytes());
    let path = common::write(&dir, "rec.out", &common::symres_data(4));
    let options = symres::SymresOptions::default().with_companion_file("station.txt");

    assert!(symres::probe_with(&path, &options).unwrap().is_match());
    assert_eq!(symres::decode_with(&path, &options).unwrap().len(), 2);
}

#[test]
fn test_truncated_files() {
    let dir = TempDir::new().unwrap();

    let mut sdas_bytes = common::sdas(&["SHZ"], 4, 2);
    sdas_bytes.pop();
    let path = common::write(&dir, "a.sdas", &sdas_bytes);
    assert!(matches!(read(&path), Err(DataloggerError::TruncatedData { .. })));

    let mut xx = common::baykal_v53(&["Z", "N"], 3);
    xx.pop();
    let path = common::write(&dir, "c.xx", &xx);
    assert!(matches!(read(&path), Err(DataloggerError::TruncatedData { .. })));

    let mut out = common::symres_data(5);
    out.pop();
    common::write(&dir, "vdaq.txt", common::VDAQ.as_bytes());
    let path = common::write(&dir, "d.out", &out);
    assert!(matches!(read(&path), Err(DataloggerError::TruncatedData { .. })));
}

#[test]
fn test_decode_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let paths = [
        common::write(&dir, "a.sdas", &common::sdas(&["SHZ", "SHN"], 4, 2)),
        common::write(&dir, "b.s24", &common::smart24(&["BHZ", "BHN"], 2)),
        common::write(&dir, "c.xx", &common::baykal_v53(&["Z"], 3)),
        common::symres(&dir, "d.out", 4, true),
    ];
    for path in &paths {
        assert_eq!(read(path).unwrap(), read(path).unwrap());
    }
}

#[test]
fn test_header_matches_traces() {
    let dir = TempDir::new().unwrap();
    let path = common::write(&dir, "b.s24", &common::smart24(&["BHZ", "BHN", "BHE"], 2));
    let format = identify(&path).unwrap();
    let header = format.parse_header(&path).unwrap();
    let traces = format.decode(&path).unwrap();

    assert_eq!(header.channels.len(), traces.len());
    for (ch, trace) in header.channels.iter().zip(&traces) {
        assert_eq!(ch.name, trace.channel);
        assert_eq!(ch.sample_rate, trace.sample_rate);
    }
    assert_eq!(header.time_base.start, traces[0].start_time);
}
