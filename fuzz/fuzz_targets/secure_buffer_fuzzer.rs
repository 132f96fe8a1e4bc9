//! Fuzz target for `SecureBuffer` range operations
//!
//! Runs arbitrary operation sequences against a buffer and a plain `Vec`
//! model side by side.
//!
//! # Invariants
//!
//! - No operation panics, out-of-range requests return errors
//! - The buffer content always equals the model
//! - Readers agree with the model bytes

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tunnelseal_buffer::SecureBuffer;

#[derive(Debug, Clone, Arbitrary)]
enum Operation {
    Append(Vec<u8>),
    Truncate(u16),
    RemoveUntil(u16),
    Slice { offset: u16, len: u16 },
    ReadU16(u16),
    ReadString(u16),
    Zero,
}

#[derive(Debug, Clone, Arbitrary)]
struct BufferScenario {
    initial: Vec<u8>,
    operations: Vec<Operation>,
}

fuzz_target!(|scenario: BufferScenario| {
    let mut buffer = SecureBuffer::from_slice(&scenario.initial);
    let mut model = scenario.initial.clone();

    for op in scenario.operations {
        match op {
            Operation::Append(bytes) => {
                buffer.append_slice(&bytes);
                model.extend_from_slice(&bytes);
            },
            Operation::Truncate(size) => {
                let size = size as usize;
                let result = buffer.truncate(size);
                if size <= model.len() {
                    assert!(result.is_ok());
                    model.truncate(size);
                } else {
                    assert!(result.is_err());
                }
            },
            Operation::RemoveUntil(offset) => {
                let offset = offset as usize;
                let result = buffer.remove_until(offset);
                if offset <= model.len() {
                    assert!(result.is_ok());
                    model.drain(..offset);
                } else {
                    assert!(result.is_err());
                }
            },
            Operation::Slice { offset, len } => {
                let (offset, len) = (offset as usize, len as usize);
                match buffer.slice(offset, len) {
                    Ok(slice) => assert_eq!(slice.as_slice(), &model[offset..offset + len]),
                    Err(_) => assert!(offset + len > model.len()),
                }
            },
            Operation::ReadU16(offset) => {
                let offset = offset as usize;
                match buffer.read_u16(offset) {
                    Ok(value) => {
                        assert_eq!(value, u16::from_be_bytes([model[offset], model[offset + 1]]));
                    },
                    Err(_) => assert!(offset + 2 > model.len()),
                }
            },
            Operation::ReadString(offset) => {
                let _ = buffer.read_null_terminated_str(offset as usize);
            },
            Operation::Zero => {
                buffer.zero();
                model.fill(0);
            },
        }

        assert_eq!(buffer.as_slice(), model.as_slice());
    }
});
