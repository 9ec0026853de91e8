// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! C3D parameter section.
//!
//! The section starts with four bytes (reserved, key, block count,
//! processor type) followed by a chain of entries:
//!
//! ```text
//! group:     [i8 name_len][i8 -id][name][u16 next][u8 desc_len][desc]
//! parameter: [i8 name_len][i8 +id][name][u16 next][i8 type][u8 ndims]
//!            [u8 dims..][values][u8 desc_len][desc]
//! ```
//!
//! A negative name length marks a locked entry. `next` counts bytes from
//! the first byte of the `next` field itself to the following entry, and is
//! trusted over the size of what was actually decoded. A zero name length
//! or a zero `next` ends the section.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::core::value::element_count;
use crate::encoding::{ByteOrder, ByteStream, SeekOrigin};
use crate::{CodecError, MetadataNode, Result, Value, ValueData, ValueKind};

use super::constants::*;

/// What the reader learned about the parameter section layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo {
    /// First block recorded in the section's own first byte
    pub declared_first_block: u8,
    /// Block count declared in the section header
    pub declared_blocks: usize,
    /// Blocks actually spanned by the entries read (the value kept)
    pub blocks: usize,
    /// Raw processor-type byte
    pub processor_type: i8,
}

/// Where the writer put things that must be patched afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLayout {
    /// Number of blocks of the section
    pub blocks: usize,
    /// Byte position of the POINT:DATA_START value, if written
    pub data_start_position: Option<usize>,
}

struct RawEntry {
    id: i8,
    node: MetadataNode,
}

/// Read the parameter section starting at `first_block` into `root`.
///
/// `data_first_block` (0 when unknown) bounds the pointer walk: an entry
/// pointing into the data section stops the parse with a warning.
pub fn read_parameters<B: AsRef<[u8]>>(
    stream: &mut ByteStream<B>,
    first_block: usize,
    data_first_block: usize,
    root: &mut MetadataNode,
) -> Result<SectionInfo> {
    let start = block_offset(first_block);
    stream.seek_read(start as i64, SeekOrigin::Begin)?;
    let declared_first_block = stream.read_u8()?;
    if usize::from(declared_first_block) != first_block {
        debug!(
            expected = first_block,
            found = declared_first_block,
            "C3D parameter section first byte differs from its block"
        );
    }
    stream.seek_read((start + OFF_SECTION_BLOCKS) as i64, SeekOrigin::Begin)?;
    let declared_blocks = usize::from(stream.read_u8()?);
    let processor_type = stream.read_i8()?;

    let data_start = if data_first_block > first_block {
        Some(block_offset(data_first_block))
    } else {
        None
    };

    let mut groups: Vec<RawEntry> = Vec::new();
    let mut parameters: Vec<RawEntry> = Vec::new();
    let mut cursor = start + OFF_SECTION_PROCESSOR + 1;
    let mut end = cursor;
    let mut warned_outside = false;

    loop {
        stream.seek_read(cursor as i64, SeekOrigin::Begin)?;
        if stream.remaining() == 0 {
            warn!(position = cursor, "C3D parameter section ends without terminator");
            break;
        }
        let name_len = stream.read_i8()?;
        if name_len == 0 {
            end = cursor + 1;
            break;
        }
        let id = stream.read_i8()?;
        if id == 0 {
            return Err(CodecError::malformed(
                "parameter linking ID",
                format!("zero ID at byte {cursor}"),
            ));
        }
        let label = stream
            .read_string(usize::from(name_len.unsigned_abs()))?
            .trim()
            .to_string();
        let next_field = stream.read_position();
        let offset = usize::from(stream.read_u16()?);
        let next = (offset != 0).then_some(next_field + offset);

        let mut node = if id < 0 {
            MetadataNode::group(label.clone(), "")
        } else {
            MetadataNode::parameter(label.clone(), read_value(stream, &label, next)?)
        };
        node.locked = name_len < 0;
        if next.map_or(true, |n| stream.read_position() < n) {
            if let Ok(len) = stream.read_u8() {
                let len = usize::from(len);
                let len = next.map_or(len, |n| len.min(n.saturating_sub(stream.read_position())));
                node.description = stream.read_string(len)?.trim().to_string();
            }
        }
        end = stream.read_position();
        if id < 0 {
            groups.push(RawEntry { id, node });
        } else {
            parameters.push(RawEntry { id, node });
        }

        let Some(next) = next else {
            break;
        };
        if next < end {
            warn!(
                label = %label,
                declared = next,
                consumed = end,
                "C3D parameter offset points inside the entry; following the declared offset"
            );
        } else if next > end {
            debug!(label = %label, gap = next - end, "C3D parameter entry followed by padding");
        }
        if next <= cursor {
            warn!(label = %label, "C3D parameter offset does not advance; parameter extraction stopped");
            break;
        }
        if data_start.is_some_and(|d| next >= d) {
            warn!(
                label = %label,
                "C3D next parameter points into the data section; parameter extraction stopped"
            );
            end = start + declared_blocks * BLOCK_SIZE;
            break;
        }
        if !warned_outside && next >= start + declared_blocks * BLOCK_SIZE {
            warn!(
                label = %label,
                "C3D next parameter points outside the declared parameter section; trying to continue"
            );
            warned_outside = true;
        }
        cursor = next;
    }

    link_entries(root, groups, parameters);

    let blocks = blocks_for(end - start);
    if blocks != declared_blocks {
        warn!(
            declared = declared_blocks,
            read = blocks,
            "C3D parameter block count differs from the blocks read; keeping the blocks read"
        );
    }
    Ok(SectionInfo {
        declared_first_block,
        declared_blocks,
        blocks,
        processor_type,
    })
}

fn read_value<B: AsRef<[u8]>>(
    stream: &mut ByteStream<B>,
    label: &str,
    next: Option<usize>,
) -> Result<Value> {
    let code = stream.read_i8()?;
    let kind = ValueKind::from_type_code(code).ok_or_else(|| {
        CodecError::malformed(
            "parameter type",
            format!("unknown type code {code} for '{label}'"),
        )
    })?;
    let ndims = usize::from(stream.read_u8()?);
    if ndims > crate::core::value::MAX_DIMENSIONS {
        return Err(CodecError::malformed(
            "parameter dimensions",
            format!("{ndims} dimensions for '{label}'"),
        ));
    }
    let dims: Vec<usize> = stream.read_bytes(ndims)?.iter().map(|&d| usize::from(d)).collect();
    let string = kind == ValueKind::Char;
    let count = element_count(&dims, string);
    let width = if string { dims.first().copied().unwrap_or(1) } else { 1 };
    let size = count * width * if string { 1 } else { kind.element_size() };

    if next.is_some_and(|n| stream.read_position() + size > n) {
        warn!(
            label = %label,
            size,
            "C3D parameter data size exceeds the declared offset; value dropped"
        );
        return Ok(Value::empty(kind));
    }

    let data = match kind {
        ValueKind::Char => ValueData::String(
            (0..count)
                .map(|_| stream.read_string(width))
                .collect::<std::result::Result<_, _>>()?,
        ),
        ValueKind::Byte => ValueData::Int8(stream.read_i8s(count)?),
        ValueKind::Integer => ValueData::Int16(stream.read_i16s(count)?),
        ValueKind::Float => ValueData::Float32(stream.read_f32s(count)?),
    };
    Value::with_dims(dims, data)
}

/// Attach groups to `root` and parameters to their group.
///
/// A parameter with ID `n` belongs to the group with ID `-|n|`. Parameters
/// without such a group are dropped; a second group reusing an ID or a label
/// is dropped too.
fn link_entries(root: &mut MetadataNode, groups: Vec<RawEntry>, parameters: Vec<RawEntry>) {
    let mut by_id: HashMap<i8, String> = HashMap::new();
    for RawEntry { id, node } in groups {
        if by_id.contains_key(&id) {
            warn!(label = %node.label, id, "C3D group ID used twice; group dropped");
            continue;
        }
        let label = node.label.clone();
        if !root.append_child(node) {
            warn!(label = %label, id, "C3D group label used twice; group dropped");
            continue;
        }
        by_id.insert(id, label);
    }
    for RawEntry { id, node } in parameters {
        let group_id = -(id.checked_abs().unwrap_or(i8::MAX));
        let Some(group) = by_id
            .get(&group_id)
            .and_then(|label| root.find_child_mut(label))
        else {
            let err = CodecError::unresolved_reference(&node.label, id);
            warn!(label = %node.label, id, "{err}; parameter dropped");
            continue;
        };
        let label = node.label.clone();
        if !group.append_child(node) {
            warn!(group = %group.label, label = %label, "C3D parameter label used twice; parameter dropped");
        }
    }
}

/// Serialize `root` as a parameter section starting at `first_block`.
///
/// Groups get IDs -1, -2, ... in tree order. The block count is written as
/// a placeholder and patched once the section size is known.
pub fn write_parameters(
    stream: &mut ByteStream<Vec<u8>>,
    first_block: usize,
    root: &MetadataNode,
    order: ByteOrder,
) -> Result<SectionLayout> {
    let start = block_offset(first_block);
    stream.seek_write(start as i64, SeekOrigin::Begin)?;
    stream.write_u8(1);
    stream.write_u8(HEADER_KEY);
    stream.write_u8(0);
    stream.write_i8(order.processor_type());

    let groups: Vec<&MetadataNode> = root.children().iter().filter(|g| g.is_group()).collect();
    if groups.len() > MAX_GROUPS {
        return Err(CodecError::layout_overflow(
            "parameter groups",
            groups.len(),
            MAX_GROUPS,
        ));
    }

    let mut data_start_position = None;
    for (idx, group) in groups.iter().enumerate() {
        let id = -((idx + 1) as i8);
        write_entry_header(stream, group, id, |s| {
            write_description(s, &group.description);
            Ok(())
        })?;
        for param in group.children() {
            let Some(value) = &param.value else {
                warn!(group = %group.label, label = %param.label, "C3D nested group cannot be stored; skipped");
                continue;
            };
            write_entry_header(stream, param, -id, |s| {
                let position = write_value(s, &group.label, &param.label, value)?;
                if group.label == "POINT"
                    && param.label == "DATA_START"
                    && value.kind() == ValueKind::Integer
                    && value.len() == 1
                {
                    data_start_position = Some(position);
                }
                write_description(s, &param.description);
                Ok(())
            })?;
        }
    }
    stream.write_u8(0);

    let blocks = blocks_for(stream.write_position() - start).max(1);
    if blocks > MAX_PARAMETER_BLOCKS {
        return Err(CodecError::layout_overflow(
            "parameter section",
            blocks,
            MAX_PARAMETER_BLOCKS,
        ));
    }
    let end = start + blocks * BLOCK_SIZE;
    stream.fill(0, end - stream.write_position());
    stream.seek_write((start + OFF_SECTION_BLOCKS) as i64, SeekOrigin::Begin)?;
    stream.write_u8(blocks as u8);
    stream.seek_write(end as i64, SeekOrigin::Begin)?;
    debug!(blocks, "C3D parameter section written");

    Ok(SectionLayout {
        blocks,
        data_start_position,
    })
}

fn write_entry_header(
    stream: &mut ByteStream<Vec<u8>>,
    node: &MetadataNode,
    id: i8,
    body: impl FnOnce(&mut ByteStream<Vec<u8>>) -> Result<()>,
) -> Result<()> {
    let len = node.label.chars().count().min(MAX_LABEL_LENGTH);
    if len == 0 {
        return Err(CodecError::malformed("parameter label", "empty label"));
    }
    let name_len = len as i8;
    stream.write_i8(if node.locked { -name_len } else { name_len });
    stream.write_i8(id);
    stream.write_string(&node.label, len);
    let next_field = stream.write_position();
    stream.write_u16(0);
    body(stream)?;
    let next = stream.write_position() - next_field;
    let next = u16::try_from(next).map_err(|_| {
        CodecError::layout_overflow(format!("parameter '{}'", node.label), next, usize::from(u16::MAX))
    })?;
    let end = stream.write_position();
    stream.seek_write(next_field as i64, SeekOrigin::Begin)?;
    stream.write_u16(next);
    stream.seek_write(end as i64, SeekOrigin::Begin)?;
    Ok(())
}

fn write_description(stream: &mut ByteStream<Vec<u8>>, description: &str) {
    let len = description.chars().count().min(MAX_DESCRIPTION_LENGTH);
    stream.write_u8(len as u8);
    stream.write_string(description, len);
}

/// Write type, dimensions and values; returns the position of the values.
fn write_value(
    stream: &mut ByteStream<Vec<u8>>,
    group: &str,
    label: &str,
    value: &Value,
) -> Result<usize> {
    stream.write_i8(value.kind().type_code());
    let dims = value.dims();
    stream.write_u8(dims.len() as u8);
    for &d in dims {
        let d = u8::try_from(d).map_err(|_| {
            CodecError::layout_overflow(format!("dimension of {group}:{label}"), d, 255)
        })?;
        stream.write_u8(d);
    }
    let position = stream.write_position();
    match value.data() {
        ValueData::String(items) => {
            let width = value.string_width();
            for s in items {
                stream.write_string(s, width);
            }
        }
        ValueData::Int8(items) => items.iter().for_each(|&v| stream.write_i8(v)),
        ValueData::Int16(items) => items.iter().for_each(|&v| stream.write_i16(v)),
        ValueData::Float32(items) => items.iter().for_each(|&v| stream.write_f32(v)),
    }
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> MetadataNode {
        let mut root = MetadataNode::root();
        let point = root.ensure_group("POINT", "3D point parameters");
        point.create_or_replace_child("USED", Value::int16(2));
        point.create_or_replace_child("SCALE", Value::float(-0.1));
        point.create_or_replace_child("LABELS", Value::strings(["LASI", "RASI"]));
        point.create_or_replace_child("DATA_START", Value::int16(0));
        let analog = root.ensure_group("ANALOG", "");
        analog.append_child(MetadataNode::parameter("BITS", Value::int8(12)).with_locked(true));
        root
    }

    fn write_then_read(order: ByteOrder) -> (MetadataNode, SectionLayout, SectionInfo) {
        let mut out = ByteStream::writer(order);
        let layout = write_parameters(&mut out, 2, &sample_tree(), order).unwrap();
        let mut input = ByteStream::new(out.into_inner(), order);
        let mut root = MetadataNode::root();
        let info = read_parameters(&mut input, 2, 0, &mut root).unwrap();
        (root, layout, info)
    }

    #[test]
    fn test_round_trip_tree() {
        for order in [
            ByteOrder::IeeeLittleEndian,
            ByteOrder::IeeeBigEndian,
            ByteOrder::VaxLittleEndian,
        ] {
            let (root, layout, info) = write_then_read(order);
            assert_eq!(layout.blocks, 1);
            assert_eq!(info.blocks, 1);
            assert_eq!(info.processor_type, order.processor_type());
            let point = root.find_child("POINT").unwrap();
            assert_eq!(point.description, "3D point parameters");
            assert_eq!(
                root.parameter_value("POINT", "SCALE").and_then(|v| v.first::<f32>()),
                Some(-0.1)
            );
            assert_eq!(
                root.parameter_value("POINT", "LABELS").map(|v| v.to_strings()),
                Some(vec!["LASI".to_string(), "RASI".to_string()])
            );
            assert!(root.lookup("ANALOG:BITS").unwrap().locked);
        }
    }

    #[test]
    fn test_data_start_position_recorded() {
        let mut out = ByteStream::writer(ByteOrder::IeeeLittleEndian);
        let layout = write_parameters(&mut out, 2, &sample_tree(), ByteOrder::IeeeLittleEndian).unwrap();
        let pos = layout.data_start_position.expect("DATA_START should be located");
        out.seek_write(pos as i64, SeekOrigin::Begin).unwrap();
        out.write_i16(7);
        let mut input = ByteStream::new(out.into_inner(), ByteOrder::IeeeLittleEndian);
        let mut root = MetadataNode::root();
        read_parameters(&mut input, 2, 0, &mut root).unwrap();
        assert_eq!(
            root.parameter_value("POINT", "DATA_START").and_then(|v| v.first::<i32>()),
            Some(7)
        );
    }

    #[test]
    fn test_orphan_parameter_dropped() {
        let mut out = ByteStream::writer(ByteOrder::IeeeLittleEndian);
        out.write_bytes(&[1, HEADER_KEY, 1, 84]);
        // group -1 "G"
        out.write_bytes(&[1, 0xFF, b'G', 3, 0, 0]);
        // parameter id 2 "P", int8 scalar, no group -2
        out.write_bytes(&[1, 2, b'P', 6, 0, 1, 0, 9, 0]);
        // parameter id 1 "Q"
        out.write_bytes(&[1, 1, b'Q', 6, 0, 1, 0, 4, 0]);
        out.write_u8(0);
        let mut input = ByteStream::new(out.into_inner(), ByteOrder::IeeeLittleEndian);
        let mut root = MetadataNode::root();
        read_parameters(&mut input, 1, 0, &mut root).unwrap();
        let group = root.find_child("G").unwrap();
        assert_eq!(group.children().len(), 1);
        assert_eq!(group.children()[0].label, "Q");
        assert!(root.lookup("G:P").is_none());
    }

    #[test]
    fn test_section_first_byte_reported() {
        let mut out = ByteStream::writer(ByteOrder::IeeeLittleEndian);
        out.write_bytes(&[7, HEADER_KEY, 1, 84]);
        out.write_bytes(&[1, 0xFF, b'G', 3, 0, 0]);
        out.write_bytes(&[1, 1, b'Q', 6, 0, 1, 0, 4, 0]);
        out.write_u8(0);
        let mut input = ByteStream::new(out.into_inner(), ByteOrder::IeeeLittleEndian);
        let mut root = MetadataNode::root();
        let info = read_parameters(&mut input, 1, 0, &mut root).unwrap();
        assert_eq!(info.declared_first_block, 7);
        assert_eq!(info.blocks, 1);
        assert!(root.lookup("G:Q").is_some());
    }

    #[test]
    fn test_declared_offset_is_followed() {
        let mut out = ByteStream::writer(ByteOrder::IeeeLittleEndian);
        out.write_bytes(&[1, HEADER_KEY, 1, 84]);
        // group with 4 junk bytes skipped by its offset
        out.write_bytes(&[1, 0xFF, b'G', 7, 0, 0, 0xAA, 0xAA, 0xAA, 0xAA]);
        out.write_bytes(&[1, 1, b'Q', 0, 0, 2, 0, 0x34, 0x12, 0]);
        let mut input = ByteStream::new(out.into_inner(), ByteOrder::IeeeLittleEndian);
        let mut root = MetadataNode::root();
        read_parameters(&mut input, 1, 0, &mut root).unwrap();
        assert_eq!(
            root.parameter_value("G", "Q").and_then(|v| v.first::<i32>()),
            Some(0x1234)
        );
    }

    #[test]
    fn test_oversized_value_kept_empty() {
        let mut out = ByteStream::writer(ByteOrder::IeeeLittleEndian);
        out.write_bytes(&[1, HEADER_KEY, 1, 84]);
        out.write_bytes(&[1, 0xFF, b'G', 3, 0, 0]);
        // float array of 10 elements but next entry after 6 bytes
        out.write_bytes(&[1, 1, b'F', 6, 0, 4, 1, 10, 0, 0, 0, 0]);
        out.write_u8(0);
        let mut input = ByteStream::new(out.into_inner(), ByteOrder::IeeeLittleEndian);
        let mut root = MetadataNode::root();
        read_parameters(&mut input, 1, 0, &mut root).unwrap();
        let value = root.parameter_value("G", "F").unwrap();
        assert!(value.is_empty());
        assert_eq!(value.kind(), ValueKind::Float);
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let mut out = ByteStream::writer(ByteOrder::IeeeLittleEndian);
        out.write_bytes(&[1, HEADER_KEY, 1, 84]);
        out.write_bytes(&[1, 1, b'X', 4, 0, 3, 0, 0]);
        let mut input = ByteStream::new(out.into_inner(), ByteOrder::IeeeLittleEndian);
        let mut root = MetadataNode::root();
        let err = read_parameters(&mut input, 1, 0, &mut root).unwrap_err();
        assert!(matches!(err, CodecError::MalformedContainer { .. }));
    }

    #[test]
    fn test_layout_overflow() {
        let mut root = MetadataNode::root();
        let group = root.ensure_group("BIG", "");
        for i in 0..600 {
            let labels: Vec<String> = (0..255).map(|j| format!("{i}-{j}")).collect();
            group.create_or_replace_child(&format!("P{i}"), Value::strings(labels));
        }
        let mut out = ByteStream::writer(ByteOrder::IeeeLittleEndian);
        let err = write_parameters(&mut out, 2, &root, ByteOrder::IeeeLittleEndian).unwrap_err();
        assert!(matches!(err, CodecError::LayoutOverflow { limit: 255, .. }));
    }

    #[test]
    fn test_dimension_overflow() {
        let mut root = MetadataNode::root();
        let group = root.ensure_group("G", "");
        group.create_or_replace_child("BIG", Value::int16s(vec![0; 300]));
        let mut out = ByteStream::writer(ByteOrder::IeeeLittleEndian);
        let err = write_parameters(&mut out, 2, &root, ByteOrder::IeeeLittleEndian).unwrap_err();
        assert!(matches!(err, CodecError::LayoutOverflow { required: 300, .. }));
    }
}
