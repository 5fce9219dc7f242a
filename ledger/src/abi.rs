//! Minimal Solidity ABI encoding for the Governor's read methods.
//!
//! Only static 32-byte words are needed: `uint256`, `address`, `uint8` and
//! `bool`. Call data is `selector || word*`; return data is one word.

use govsync_types::ProposalState;

use crate::{CallArg, CallError, LedgerCall, LedgerMethod};

const WORD: usize = 32;

/// Encode `selector || args` for a call, checking the argument shape.
pub fn encode_call_data(call: &LedgerCall) -> Result<Vec<u8>, CallError> {
    let shape_ok = match call.method {
        LedgerMethod::State => matches!(call.args.as_slice(), [CallArg::Uint256(_)]),
        LedgerMethod::HasVoted => matches!(
            call.args.as_slice(),
            [CallArg::Uint256(_), CallArg::Address(_)]
        ),
    };
    if !shape_ok {
        return Err(CallError::Encoding(format!(
            "arguments {:?} do not match {}",
            call.args,
            call.method.signature()
        )));
    }

    let mut data = Vec::with_capacity(4 + WORD * call.args.len());
    data.extend_from_slice(&call.method.selector());
    for arg in &call.args {
        match arg {
            CallArg::Uint256(id) => data.extend_from_slice(id.as_bytes()),
            CallArg::Address(address) => data.extend_from_slice(&address.to_word()),
        }
    }
    Ok(data)
}

/// Decode a single static word, requiring the value to fit in one byte.
fn decode_small_word(data: &[u8]) -> Result<u8, String> {
    if data.len() != WORD {
        return Err(format!("expected {WORD} bytes, got {}", data.len()));
    }
    if data[..WORD - 1].iter().any(|b| *b != 0) {
        return Err("value does not fit in one byte".into());
    }
    Ok(data[WORD - 1])
}

/// Decode the return data of `state(uint256)`.
pub fn decode_state(data: &[u8]) -> Result<ProposalState, String> {
    let code = decode_small_word(data)?;
    ProposalState::from_code(code).map_err(|e| e.to_string())
}

/// Decode the return data of `hasVoted(uint256,address)`.
pub fn decode_bool(data: &[u8]) -> Result<bool, String> {
    match decode_small_word(data)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(format!("invalid bool value {other}")),
    }
}

/// ABI word holding a small unsigned value.
pub fn encode_small_word(value: u8) -> Vec<u8> {
    let mut word = vec![0u8; WORD];
    word[WORD - 1] = value;
    word
}

/// Return data the Governor produces for `state()`.
pub fn encode_state(state: ProposalState) -> Vec<u8> {
    encode_small_word(state.code())
}

/// Return data the Governor produces for `hasVoted()`.
pub fn encode_bool(value: bool) -> Vec<u8> {
    encode_small_word(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use govsync_types::{Address, ProposalId};

    fn governor() -> Address {
        Address::new([0x99; 20])
    }

    #[test]
    fn state_call_data_layout() {
        let call = LedgerCall::state(governor(), ProposalId::from_u64(0x0102));
        let data = encode_call_data(&call).unwrap();
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &[0x3e, 0x4f, 0x49, 0xe6]);
        assert_eq!(&data[4..34], &[0u8; 30]);
        assert_eq!(&data[34..], &[0x01, 0x02]);
    }

    #[test]
    fn has_voted_call_data_layout() {
        let voter = Address::new([0xaa; 20]);
        let call = LedgerCall::has_voted(governor(), ProposalId::from_u64(7), voter);
        let data = encode_call_data(&call).unwrap();
        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &[0x43, 0x85, 0x96, 0x32]);
        assert_eq!(data[35], 7);
        assert_eq!(&data[36..48], &[0u8; 12]);
        assert_eq!(&data[48..], &[0xaa; 20]);
    }

    #[test]
    fn mismatched_arguments_are_rejected() {
        let call = LedgerCall {
            contract: governor(),
            method: LedgerMethod::HasVoted,
            args: vec![CallArg::Uint256(ProposalId::from_u64(1))],
        };
        assert!(matches!(encode_call_data(&call), Err(CallError::Encoding(_))));
    }

    #[test]
    fn decodes_every_state() {
        for state in ProposalState::ALL {
            assert_eq!(decode_state(&encode_state(state)).unwrap(), state);
        }
    }

    #[test]
    fn rejects_out_of_range_state() {
        assert!(decode_state(&encode_small_word(8)).is_err());
        let mut wide = encode_small_word(1);
        wide[0] = 1;
        assert!(decode_state(&wide).is_err());
    }

    #[test]
    fn rejects_short_return_data() {
        assert!(decode_state(&[]).is_err());
        assert!(decode_bool(&[1]).is_err());
    }

    #[test]
    fn decodes_bools() {
        assert!(decode_bool(&encode_bool(true)).unwrap());
        assert!(!decode_bool(&encode_bool(false)).unwrap());
        assert!(decode_bool(&encode_small_word(2)).is_err());
    }
}
