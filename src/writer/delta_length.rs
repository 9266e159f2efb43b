// Delta length byte array encoding for strings.
//
// The lengths of the non-null values are delta-binary-packed as i32, then
// the raw bytes of those values are concatenated. Null slots contribute
// nothing; the definition levels carry their positions.

use crate::writer::delta::{decode_delta_i32, encode_delta_i32};

/// Encode non-null values of a string column.
pub fn encode_delta_length<'a, I>(values: I, output: &mut Vec<u8>)
where
    I: Iterator<Item = &'a [u8]> + Clone,
{
    let lengths: Vec<i32> = values.clone().map(|v| v.len() as i32).collect();
    if lengths.is_empty() {
        return;
    }
    encode_delta_i32(&lengths, output);
    for v in values {
        output.extend_from_slice(v);
    }
}

/// Decode a delta-length byte array page back into owned values.
pub fn decode_delta_length(data: &[u8], pos: &mut usize) -> Option<Vec<Vec<u8>>> {
    let lengths = decode_delta_i32(data, pos)?;
    let mut out = Vec::with_capacity(lengths.len());
    for len in lengths {
        let len = usize::try_from(len).ok()?;
        let bytes = data.get(*pos..*pos + len)?;
        out.push(bytes.to_vec());
        *pos += len;
    }
    Some(out)
}
