use super::*;
use crate::error::{LookupError, WriterError};
use crate::model::{
    BindingInfo, BindingType, FaceCullMode, ImageShape, ImageType, NumericType, OptionInfo,
    ScalarType, ShaderVariant, ShaderVariantKey, StructureType,
};
use std::io::Cursor;
use std::sync::Arc;

fn shader_info(source_hash: u32, program_invariance_mask: u32) -> ShaderInfo {
    ShaderInfo {
        source_hash,
        program_invariance_mask,
        options: vec![
            OptionInfo::enumerated("Mode", ["A", "B", "C"]),
            OptionInfo::boolean("Blend"),
        ],
        vertex_attributes: vec!["position".into()],
        instance_attributes: Vec::new(),
        bindings: vec!["albedo".into(), "block_1_1".into()],
    }
}

fn variant(source_hash: u32, option_bits: u32, program: &str) -> ShaderVariant {
    let mut pipeline_state = PipelineState::default();
    pipeline_state.depth_write = option_bits & 0b100 == 0;
    ShaderVariant {
        key: ShaderVariantKey::new(source_hash, option_bits),
        pipeline_state,
        vertex_attributes: vec![VertexAttributeInfo {
            location: 0,
            name: "position".into(),
            ty: NumericType::vector(ScalarType::Float, 3),
            is_instance: false,
        }],
        binding_set_sizes: vec![2],
        bindings: vec![
            BindingInfo::new(
                0,
                0,
                "albedo",
                BindingType::Image(ImageType::new(ScalarType::Float, ImageShape::D2, true)),
            ),
            BindingInfo::new(
                0,
                1,
                "block_1_1",
                BindingType::Structure(StructureType::from_members([(
                    "tint",
                    NumericType::vector(ScalarType::Float, 4),
                )])),
            ),
        ],
        vertex_program: Arc::from(format!("vertex:{program}").into_bytes()),
        fragment_program: Arc::from(format!("fragment:{program}").into_bytes()),
    }
}

fn write_set(shaders: &[(ShaderInfo, &str, Option<&str>, Vec<ShaderVariant>)]) -> Vec<u8> {
    let mut writer = ShaderSetWriter::new(Cursor::new(Vec::new()));
    for (info, name, source, variants) in shaders {
        writer
            .add_shader(
                info.clone(),
                *name,
                source.map(str::to_string),
                variants.len() as u32,
            )
            .unwrap();
    }
    for (_, _, _, variants) in shaders {
        for variant in variants {
            writer.write_variant(variant).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

#[test]
fn test_roundtrip_multiple_shaders() {
    let first: Vec<_> = [5, 0, 4, 2, 1]
        .into_iter()
        .map(|bits| variant(0xAAAA, bits, &format!("first{bits}")))
        .collect();
    let second: Vec<_> = [1, 0]
        .into_iter()
        .map(|bits| variant(0xBBBB, bits, &format!("second{bits}")))
        .collect();
    let bytes = write_set(&[
        (shader_info(0xAAAA, 0), "first", Some("source text"), first.clone()),
        (shader_info(0xBBBB, 0), "second", None, second.clone()),
    ]);

    let mut set = FileShaderSet::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(set.total_variant_count(), 7);
    for expected in first.iter().chain(&second) {
        let read = set.get_variant(expected.key).unwrap();
        assert_eq!(*read, *expected);
    }
    assert_eq!(set.source(0xAAAA), Some("source text"));
    assert_eq!(set.source(0xBBBB), None);
    assert_eq!(set.get_shader_info("second").unwrap().source_hash, 0xBBBB);
    assert_eq!(set.source_by_name("first"), Some("source text"));
}

#[test]
fn test_index_is_sorted_per_shader() {
    let variants: Vec<_> = [5, 0, 4, 2, 1]
        .into_iter()
        .map(|bits| variant(1, bits, &bits.to_string()))
        .collect();
    let bytes = write_set(&[(shader_info(1, 0), "s", None, variants)]);
    let reader = ShaderSetReader::new(Cursor::new(bytes)).unwrap();
    let bits: Vec<_> = reader.variants_of(0).unwrap().iter().map(|v| v.option_bits).collect();
    assert_eq!(bits, [0, 1, 2, 4, 5]);
    assert!(reader.variants_of(1).is_none());
    assert!(reader.find_variant(1, 0).is_none());
}

#[test]
fn test_shared_programs_are_stored_once() {
    // Bit 2 is the "Blend" option and does not affect programs
    let base = variant(7, 0b001, "shared");
    let blended = base.as_program_invariant(ShaderVariantKey::new(7, 0b101), {
        let mut state = base.pipeline_state.clone();
        state.cull_mode = FaceCullMode::None;
        state
    });
    let other = variant(7, 0b010, "other");
    let bytes = write_set(&[(
        shader_info(7, 0b100),
        "s",
        None,
        vec![base.clone(), other, blended.clone()],
    )]);

    assert_eq!(count_occurrences(&bytes, b"vertex:shared"), 1);
    assert_eq!(count_occurrences(&bytes, b"fragment:shared"), 1);
    assert_eq!(count_occurrences(&bytes, b"vertex:other"), 1);

    let mut set = FileShaderSet::from_reader(Cursor::new(bytes)).unwrap();
    let read_base = set.get_variant(base.key).unwrap();
    let read_blended = set.get_variant(blended.key).unwrap();
    assert_eq!(read_blended.vertex_program, read_base.vertex_program);
    assert_eq!(read_blended.fragment_program, read_base.fragment_program);
    assert!(read_blended.shares_programs_with(&read_base));
    assert_eq!(read_blended.pipeline_state.cull_mode, FaceCullMode::None);
    assert_eq!(read_base.pipeline_state.cull_mode, FaceCullMode::Back);
}

#[test]
fn test_unwritten_slots_are_skipped() {
    let mut writer = ShaderSetWriter::new(Cursor::new(Vec::new()));
    writer.add_shader(shader_info(3, 0), "s", None, 3).unwrap();
    writer.write_variant(&variant(3, 2, "two")).unwrap();
    writer.write_variant(&variant(3, 0, "zero")).unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let mut set = FileShaderSet::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(
        set.variant_keys(3),
        [ShaderVariantKey::new(3, 0), ShaderVariantKey::new(3, 2)]
    );
    assert!(set.try_get_variant(ShaderVariantKey::new(3, 1)).unwrap().is_none());
    assert!(
        set.try_get_variant(ShaderVariantKey::new(3, u32::MAX))
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_writer_misuse() {
    let mut writer = ShaderSetWriter::new(Cursor::new(Vec::new()));
    writer.add_shader(shader_info(1, 0), "s", None, 1).unwrap();

    let err = writer.write_variant(&variant(2, 0, "x")).unwrap_err();
    assert!(matches!(err, WriterError::UnknownShader(2)));

    writer.write_variant(&variant(1, 0, "x")).unwrap();
    let err = writer.write_variant(&variant(1, 1, "y")).unwrap_err();
    assert!(matches!(err, WriterError::VariantSlotsExhausted { hash: 1, count: 1 }));

    let err = writer.add_shader(shader_info(2, 0), "t", None, 1).unwrap_err();
    assert!(matches!(err, WriterError::ShadersSealed));
}

#[test]
fn test_empty_set_is_valid() {
    let mut writer = ShaderSetWriter::new(Cursor::new(Vec::new()));
    writer.add_shader(shader_info(9, 0), "empty", None, 0).unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let set = FileShaderSet::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(set.total_variant_count(), 0);
    assert!(set.shader_info(9).is_some());
}

#[test]
fn test_rejects_bad_headers() {
    let bytes = write_set(&[(shader_info(1, 0), "s", None, vec![variant(1, 0, "x")])]);

    let mut bad_magic = bytes.clone();
    bad_magic[0] ^= 0xFF;
    assert!(matches!(
        ShaderSetReader::new(Cursor::new(bad_magic)),
        Err(FormatError::InvalidMagic(_))
    ));

    let mut bad_version = bytes;
    bad_version[4] = 99;
    assert!(matches!(
        ShaderSetReader::new(Cursor::new(bad_version)),
        Err(FormatError::UnsupportedVersion(99))
    ));
}

#[test]
fn test_fallback_chain() {
    let base_bytes = write_set(&[(
        shader_info(0xF00, 0),
        "base",
        Some("base source"),
        vec![variant(0xF00, 1, "base")],
    )]);
    let override_bytes = write_set(&[(
        shader_info(0xABC, 0),
        "override",
        None,
        vec![variant(0xABC, 0, "override")],
    )]);

    let base = FileShaderSet::from_reader(Cursor::new(base_bytes)).unwrap();
    let mut set = FileShaderSet::from_reader(Cursor::new(override_bytes)).unwrap();
    set.set_fallback(Box::new(base));

    assert_eq!(set.shader_info(0xF00).unwrap().source_hash, 0xF00);
    assert!(set.shader_info_by_name("base").is_some());
    assert_eq!(set.source(0xF00), Some("base source"));
    let variant = set.get_variant(ShaderVariantKey::new(0xF00, 1)).unwrap();
    assert_eq!(&*variant.vertex_program, b"vertex:base");
    assert!(set.get_variant(ShaderVariantKey::new(0xABC, 0)).is_ok());

    let missing = set.get_variant(ShaderVariantKey::new(0x123, 0)).unwrap_err();
    assert!(matches!(missing, LookupError::Variant(_)));
    assert!(set.take_fallback().is_some());
    assert!(set.shader_info(0xF00).is_none());
}

#[test]
fn test_load_all_and_cache() {
    let variants: Vec<_> = (0..4).map(|bits| variant(5, bits, "p")).collect();
    let bytes = write_set(&[(shader_info(5, 0), "s", None, variants)]);
    let mut set = FileShaderSet::from_reader(Cursor::new(bytes)).unwrap();

    assert_eq!(set.loaded_variant_count(), 0);
    let first = set.get_variant(ShaderVariantKey::new(5, 3)).unwrap();
    let again = set.get_variant(ShaderVariantKey::new(5, 3)).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(set.loaded_variant_count(), 1);

    set.load_all().unwrap();
    assert_eq!(set.loaded_variant_count(), 4);
    set.clear_loaded();
    assert_eq!(set.loaded_variant_count(), 0);
}

#[test]
fn test_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shaders.shadercache");
    let expected = variant(0x42, 1, "file");

    let file = std::io::BufWriter::new(std::fs::File::create(&path).unwrap());
    let mut writer = ShaderSetWriter::new(file);
    writer
        .add_shader(shader_info(0x42, 0), "on_disk", Some("src".into()), 1)
        .unwrap();
    writer.write_variant(&expected).unwrap();
    writer.finish().unwrap();

    let mut set = FileShaderSet::open(&path).unwrap();
    assert_eq!(*set.get_variant(expected.key).unwrap(), expected);
    assert_eq!(set.shader_names().collect::<Vec<_>>(), ["on_disk"]);
}
