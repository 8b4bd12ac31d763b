//! Extended Inquiry Response (EIR) parsing.
//!
//! Bluedroid hands discovery results over as raw EIR payloads: a run of
//! `[length, type, data...]` records. The only record we care about is
//! the peer's local name, which identifies the receiver during inquiry.

use heapless::String;

/// EIR record type: shortened local name.
const EIR_TYPE_SHORT_LOCAL_NAME: u8 = 0x08;

/// EIR record type: complete local name.
const EIR_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// Extract the complete or shortened local name from raw EIR data.
///
/// Returns `None` when no name record is present or the records are
/// malformed. Names longer than 32 bytes are truncated.
pub fn extract_local_name(data: &[u8]) -> Option<String<32>> {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        let eir_type = data[i + 1];
        if eir_type == EIR_TYPE_SHORT_LOCAL_NAME || eir_type == EIR_TYPE_COMPLETE_LOCAL_NAME {
            let name_bytes = &data[i + 2..i + 1 + len];
            let mut name = String::new();
            for &b in name_bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
            return Some(name);
        }
        i += len + 1;
    }
    None
}

/// True when the EIR payload names the expected peer.
pub fn names_peer(data: &[u8], expected: &str) -> bool {
    extract_local_name(data).is_some_and(|name| name.as_str() == expected)
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════
