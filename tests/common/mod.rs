//! Synthetic recordings for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

pub fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn le16(out: &mut Vec<u8>, values: &[i16]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn le32(out: &mut Vec<u8>, values: &[i32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn padded(s: &str, width: usize, fill: u8) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.resize(width, fill);
    v
}

/// SDAS file: `names.len()` channels at `freq` Hz, one-second fragments.
/// Sample `s` of channel `c` in block `b` is `c * 1000 + b * 100 + s`.
pub fn sdas(names: &[&str], freq: u32, blocks: usize) -> Vec<u8> {
    let ids: Vec<String> = (1..=names.len()).map(|i| i.to_string()).collect();
    let ids = ids.join(",");
    let mut body = format!(
        "[SYSTEM]\nNAME=YAK\nN_GROUP=1\n[FILE]\nSTREAM=1\n\
         [STREAM1]\nREC_SIZE_SEC=1\nFILE_SIZE_SEC={blocks}\nCH#={ids}\n\
         [GROUP1]\nFREQ={freq}\nCH#={ids}\n"
    );
    for (i, name) in names.iter().enumerate() {
        body.push_str(&format!("[CH{}]\nNAME={name}\n", i + 1));
    }

    let body_len = body.len() + 200;
    let header_size = body_len + 98;
    let offset = body_len + 64;
    let mut data = format!(
        "[HEADER]\nHEADER_SIZE={header_size:06}\nOFFSET_TO_DATA={offset:06}\n{body}"
    )
    .into_bytes();
    data.resize(offset, 0);

    for block in 0..blocks {
        let mut preamble = vec![0u8; 256];
        let mut time = Vec::new();
        le16(&mut time, &[14, 7, 2016, 3, 15, 59, 250]);
        preamble[8..8 + time.len()].copy_from_slice(&time);
        data.extend(preamble);
        for ch in 0..names.len() {
            let fragment: Vec<i16> = (0..freq as usize)
                .map(|s| (ch * 1000 + block * 100 + s) as i16)
                .collect();
            le16(&mut data, &fragment);
        }
    }
    data
}

/// Smart24 file header with a channel string table for `channels`.
pub fn smart24_header(channels: &[&str], tag: &[u8; 8]) -> Vec<u8> {
    let mut h = vec![0u8; 72];
    h[0..4].copy_from_slice(&5i32.to_le_bytes());
    h[8..15].copy_from_slice(b"SMART24");
    h[16..24].copy_from_slice(tag);
    h[40..44].copy_from_slice(&(channels.len() as i32).to_le_bytes());
    h[48..68].copy_from_slice(b"2015-062T12:00:00.00");
    h[68..72].copy_from_slice(&((channels.len() * 10) as i32).to_le_bytes());
    for chan in channels {
        h.extend(padded("KULU", 5, b' '));
        h.extend(padded(chan, 3, b' '));
        h.extend(padded("00", 2, b' '));
    }
    while h.len() % 4 != 0 {
        h.push(0);
    }
    h
}

/// One Smart24 subframe carrying `samples` over a minute.
pub fn smart24_subframe(chan: &str, samples: &[i32]) -> Vec<u8> {
    let mut s = vec![0u8; 116];
    s[12..17].copy_from_slice(&padded("KULU", 5, b' '));
    s[17..20].copy_from_slice(&padded(chan, 3, b' '));
    s[20..22].copy_from_slice(b"00");
    s[52..56].copy_from_slice(&60_000i32.to_le_bytes());
    s[56..60].copy_from_slice(&(samples.len() as i32).to_le_bytes());
    s[60..64].copy_from_slice(&48i32.to_le_bytes());
    s[112..116].copy_from_slice(&((samples.len() * 4) as i32).to_le_bytes());
    le32(&mut s, samples);
    s.extend_from_slice(&[0u8; 12]);
    s
}

/// Continuous Smart24 file of `frames` frames at 2 Hz.
pub fn smart24(channels: &[&str], frames: usize) -> Vec<u8> {
    let mut data = smart24_header(channels, b"FILE_CON");
    for frame in 0..frames {
        for (c, chan) in channels.iter().enumerate() {
            let samples: Vec<i32> = (0..120)
                .map(|i| (c * 10_000 + frame * 120 + i) as i32)
                .collect();
            data.extend(smart24_subframe(chan, &samples));
        }
    }
    data
}

/// Baykal XX general header.
pub fn baykal_general(version: u16, channels: u16) -> Vec<u8> {
    let mut out = Vec::new();
    for v in [channels, 0, version, 1, 3, 2019, 7, 0, 1, 24, 0, 0, 0, 0, 0, 0] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend(padded("IRK", 16, 0));
    for v in [0.02f64, 60.0, 0.0, 52.2, 104.3] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&[0u8; 32]);
    out
}

/// Baykal XX v53 file with `rows` rows of i32 samples.
pub fn baykal_v53(names: &[&str], rows: usize) -> Vec<u8> {
    let mut out = baykal_general(53, names.len() as u16);
    for (i, name) in names.iter().enumerate() {
        out.extend_from_slice(&(i as i16).to_le_bytes());
        out.extend_from_slice(&[0u8; 6]);
        out.extend(padded(name, 24, 0));
        out.extend_from_slice(&[0u8; 24]);
        out.extend_from_slice(&50.0f64.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
    }
    for r in 0..rows {
        let row: Vec<i32> = (0..names.len()).map(|c| (r * 10 + c) as i32 - 5).collect();
        le32(&mut out, &row);
    }
    out
}

pub const VDAQ: &str = "SampleRate: 100\nA-DInfo: SRX\nChannels: 3\nCh1ID: HHZ\nCh2ID: HHN\n";

/// Symmetric Research samples: time column then two channels.
pub fn symres_data(rows: usize) -> Vec<u8> {
    let time = [23_000, 1_234, 500, 0];
    let mut out = Vec::new();
    for r in 0..rows {
        let t = time.get(r).copied().unwrap_or(0);
        le32(&mut out, &[t, r as i32, -(r as i32)]);
    }
    out
}

/// Write a `.out` file and, optionally, its `vdaq.txt` into `dir`.
pub fn symres(dir: &TempDir, name: &str, rows: usize, with_vdaq: bool) -> PathBuf {
    if with_vdaq {
        write(dir, "vdaq.txt", VDAQ.as_bytes());
    }
    write(dir, name, &symres_data(rows))
}
