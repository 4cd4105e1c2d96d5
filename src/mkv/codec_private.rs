//! Codec private data builders for common track codecs

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, StreamError};

/// AAC sampling frequencies, indexed by their AudioSpecificConfig code.
pub const AAC_SAMPLING_FREQUENCIES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

pub const AAC_CODEC_PRIVATE_LEN: usize = 2;
pub const PCM_CODEC_PRIVATE_LEN: usize = 18;

const PCM_MIN_SAMPLING_RATE: u32 = 8000;
const PCM_MAX_SAMPLING_RATE: u32 = 192_000;

const AVCC_LENGTH_PREFIX: usize = 4;
const NAL_TYPE_SPS: u8 = 0x07;
const NAL_TYPE_PPS: u8 = 0x08;

/// MPEG-4 audio object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Mpeg4AudioObjectType {
    AacMain = 1,
    AacLc = 2,
    AacSsr = 3,
    AacLtp = 4,
    Sbr = 5,
    AacScalable = 6,
}

/// G.711 PCM variants carried in a WAVEFORMATEX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum PcmFormat {
    ALaw = 6,
    MuLaw = 7,
}

/// Build a 2-byte AAC AudioSpecificConfig.
pub fn aac_codec_private(
    object_type: Mpeg4AudioObjectType,
    frequency: u32,
    channels: u8,
) -> Result<[u8; AAC_CODEC_PRIVATE_LEN]> {
    let freq_index = AAC_SAMPLING_FREQUENCIES
        .iter()
        .position(|&f| f == frequency)
        .ok_or_else(|| {
            StreamError::invalid_argument(format!("unsupported AAC sampling frequency {frequency}"))
        })?;

    let config =
        ((object_type as u16) << 11) | ((freq_index as u16) << 7) | (u16::from(channels) << 3);
    Ok(config.to_be_bytes())
}

/// Build an 18-byte WAVEFORMATEX for A-law or mu-law audio.
pub fn pcm_codec_private(
    format: PcmFormat,
    sampling_rate: u32,
    channels: u8,
) -> Result<[u8; PCM_CODEC_PRIVATE_LEN]> {
    if !(PCM_MIN_SAMPLING_RATE..=PCM_MAX_SAMPLING_RATE).contains(&sampling_rate) {
        return Err(StreamError::invalid_argument(format!(
            "PCM sampling rate {sampling_rate} out of range"
        )));
    }
    if !(1..=2).contains(&channels) {
        return Err(StreamError::invalid_argument(format!(
            "PCM channel count {channels} must be 1 or 2"
        )));
    }

    let channels = u16::from(channels);
    let bytes_per_sec = u32::from(channels) * sampling_rate / 8;

    let mut out = [0u8; PCM_CODEC_PRIVATE_LEN];
    out[0..2].copy_from_slice(&(format as u16).to_le_bytes());
    out[2..4].copy_from_slice(&channels.to_le_bytes());
    out[4..8].copy_from_slice(&sampling_rate.to_le_bytes());
    out[8..12].copy_from_slice(&bytes_per_sec.to_le_bytes());
    out[12..14].copy_from_slice(&channels.to_le_bytes());
    Ok(out)
}

/// Convert Annex-B framed H.264 into AVCC (4-byte big-endian NAL lengths).
///
/// Both 3- and 4-byte start codes are recognized. Emulation prevention bytes
/// are kept. Scanning stops at a `00 00 00 00` sequence.
pub fn annexb_to_avcc(annexb: &[u8]) -> Result<Vec<u8>> {
    let nal_starts = scan_start_codes(annexb);
    if nal_starts.is_empty() {
        return Err(StreamError::invalid_argument("no NAL unit found in Annex-B data"));
    }

    // (begin, end) of every NAL body; each runs to the next start code
    let mut nals = Vec::with_capacity(nal_starts.len());
    for (i, &(begin, _)) in nal_starts.iter().enumerate() {
        let end = nal_starts
            .get(i + 1)
            .map_or(annexb.len(), |&(next_begin, code_len)| next_begin - code_len);
        nals.push((begin, end));
    }

    let total: usize = nals.iter().map(|(b, e)| AVCC_LENGTH_PREFIX + (e - b)).sum();
    let mut out = Vec::with_capacity(total);
    for (begin, end) in nals {
        out.extend_from_slice(&((end - begin) as u32).to_be_bytes());
        out.extend_from_slice(&annexb[begin..end]);
    }

    debug!(annexb_len = annexb.len(), avcc_len = out.len(), "Converted Annex-B to AVCC");
    Ok(out)
}

/// Returns (NAL body offset, start code length) pairs.
fn scan_start_codes(buf: &[u8]) -> Vec<(usize, usize)> {
    let mut starts = Vec::new();
    let mut i = 0;

    while i + 4 < buf.len() {
        if buf[i] != 0x00 {
            i += 1;
        } else if buf[i + 1] != 0x00 {
            i += 2;
        } else if buf[i + 2] == 0x01 {
            i += 3;
            starts.push((i, 3));
        } else if buf[i + 2] != 0x00 {
            i += 3;
        } else if buf[i + 3] == 0x01 {
            i += 4;
            starts.push((i, 4));
        } else if buf[i + 3] == 0x00 {
            break;
        } else {
            i += 4;
        }
    }

    starts
}

fn is_nal_of_type(header: u8, nal_type: u8) -> bool {
    header & 0x80 == 0 && header & 0x60 != 0 && header & 0x1F == nal_type
}

/// Find the first SPS and PPS NAL units in AVCC data.
///
/// Truncated length prefixes or NAL bodies end the scan.
pub fn h264_sps_pps(avcc: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut sps = None;
    let mut pps = None;
    let mut idx = 0;

    while idx + AVCC_LENGTH_PREFIX <= avcc.len() && (sps.is_none() || pps.is_none()) {
        let mut len_bytes = [0u8; AVCC_LENGTH_PREFIX];
        len_bytes.copy_from_slice(&avcc[idx..idx + AVCC_LENGTH_PREFIX]);
        let nal_len = u32::from_be_bytes(len_bytes) as usize;
        idx += AVCC_LENGTH_PREFIX;

        let Some(nal) = avcc.get(idx..idx.saturating_add(nal_len)) else {
            break;
        };
        if let Some(&header) = nal.first() {
            if sps.is_none() && is_nal_of_type(header, NAL_TYPE_SPS) {
                sps = Some(nal);
            }
            if pps.is_none() && is_nal_of_type(header, NAL_TYPE_PPS) {
                pps = Some(nal);
            }
        }
        idx += nal_len;
    }

    sps.zip(pps)
}

/// Build an avcC decoder configuration record from AVCC data holding an SPS
/// and a PPS.
pub fn h264_codec_private(avcc: &[u8]) -> Result<Vec<u8>> {
    let (sps, pps) = h264_sps_pps(avcc)
        .ok_or_else(|| StreamError::invalid_argument("SPS or PPS not found in AVCC data"))?;
    if sps.len() < 4 {
        return Err(StreamError::invalid_argument(format!(
            "SPS too short ({} bytes)",
            sps.len()
        )));
    }
    let sps_len = u16::try_from(sps.len())
        .map_err(|_| StreamError::invalid_argument("SPS longer than 65535 bytes"))?;
    let pps_len = u16::try_from(pps.len())
        .map_err(|_| StreamError::invalid_argument("PPS longer than 65535 bytes"))?;

    let mut out = Vec::with_capacity(11 + sps.len() + pps.len());
    out.push(0x01); // configurationVersion
    out.extend_from_slice(&sps[1..4]); // profile, compatibility, level
    out.push(0xFF); // 4-byte NAL lengths
    out.push(0xE1); // one SPS
    out.extend_from_slice(&sps_len.to_be_bytes());
    out.extend_from_slice(sps);
    out.push(0x01); // one PPS
    out.extend_from_slice(&pps_len.to_be_bytes());
    out.extend_from_slice(pps);
    Ok(out)
}
