//! Structure block edge cases, exercised against hand-assembled blobs.

#[cfg(test)]
mod test {
    use fdt_query::{Fdt, FdtError, NodeOffset, FDT_MAGIC};

    /// Minimal DTB assembler for tests: fixed header, empty memory
    /// reservation block, then the structure and strings blocks.
    struct BlobBuilder {
        structure: Vec<u8>,
        strings: Vec<u8>,
    }

    impl BlobBuilder {
        fn new() -> Self {
            BlobBuilder {
                structure: Vec::new(),
                strings: Vec::new(),
            }
        }

        fn token(&mut self, value: u32) -> &mut Self {
            self.structure.extend_from_slice(&value.to_be_bytes());
            self
        }

        fn pad(&mut self) {
            while self.structure.len() % 4 != 0 {
                self.structure.push(0);
            }
        }

        fn begin_node(&mut self, name: &str) -> &mut Self {
            self.token(0x1);
            self.structure.extend_from_slice(name.as_bytes());
            self.structure.push(0);
            self.pad();
            self
        }

        fn end_node(&mut self) -> &mut Self {
            self.token(0x2)
        }

        fn nop(&mut self) -> &mut Self {
            self.token(0x4)
        }

        fn intern(&mut self, name: &str) -> u32 {
            let off = self.strings.len() as u32;
            self.strings.extend_from_slice(name.as_bytes());
            self.strings.push(0);
            off
        }

        fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
            let nameoff = self.intern(name);
            self.token(0x3).token(value.len() as u32).token(nameoff);
            self.structure.extend_from_slice(value);
            self.pad();
            self
        }

        /// A `PROP` token whose declared length and name offset are not
        /// backed by any value bytes.
        fn prop_header_only(&mut self, len: u32, nameoff: u32) -> &mut Self {
            self.token(0x3).token(len).token(nameoff)
        }

        fn finish(mut self) -> Vec<u8> {
            self.token(0x9);
            let off_rsvmap = 40u32;
            let off_struct = off_rsvmap + 16;
            let off_strings = off_struct + self.structure.len() as u32;
            let totalsize = off_strings + self.strings.len() as u32;

            let mut blob = Vec::new();
            for field in [
                FDT_MAGIC,
                totalsize,
                off_struct,
                off_strings,
                off_rsvmap,
                17,
                16,
                0,
                self.strings.len() as u32,
                self.structure.len() as u32,
            ] {
                blob.extend_from_slice(&field.to_be_bytes());
            }
            blob.extend_from_slice(&[0u8; 16]);
            blob.extend_from_slice(&self.structure);
            blob.extend_from_slice(&self.strings);
            blob
        }
    }

    fn parse(blob: &[u8]) -> Fdt<'_> {
        let _ = env_logger::builder().is_test(true).try_init();
        Fdt::from_bytes(blob).unwrap()
    }

    #[test]
    fn two_cell_integer_decodes_high_first() {
        let mut b = BlobBuilder::new();
        b.begin_node("");
        b.prop("clock-frequency", &[0, 0, 0, 1, 0, 0, 0, 2]);
        b.end_node();
        let blob = b.finish();

        let fdt = parse(&blob);
        assert_eq!(
            fdt.u64(NodeOffset::ROOT, "clock-frequency").unwrap(),
            0x1_0000_0002
        );
    }

    #[test]
    fn nop_tokens_are_skipped_everywhere() {
        let mut b = BlobBuilder::new();
        b.nop();
        b.begin_node("");
        b.nop();
        b.prop("model", b"test\0");
        b.nop();
        b.begin_node("dev@0");
        b.end_node();
        b.nop();
        b.end_node();
        let blob = b.finish();

        let fdt = parse(&blob);
        // the root handle stays offset 0 even with a leading NOP
        assert_eq!(fdt.string(NodeOffset::ROOT, "model").unwrap(), "test");
        let dev = fdt.path("/dev@0").unwrap();
        assert_eq!(fdt.node(dev).unwrap().name(), "dev@0");
    }

    #[test]
    fn end_token_inside_node_is_rejected() {
        let mut b = BlobBuilder::new();
        b.begin_node("");
        b.begin_node("dev@0");
        // structure ends without closing either node; finish() emits END
        let blob = b.finish();

        let fdt = parse(&blob);
        assert!(matches!(
            fdt.path("/missing"),
            Err(FdtError::BadToken { value: 0x9, .. })
        ));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let mut b = BlobBuilder::new();
        b.begin_node("");
        b.begin_node("dev@0");
        b.end_node();
        b.token(0x7);
        b.end_node();
        let blob = b.finish();

        let fdt = parse(&blob);
        assert!(matches!(
            fdt.path("/missing"),
            Err(FdtError::BadToken { value: 0x7, .. })
        ));
    }

    #[test]
    fn truncated_structure_block_fails_closed() {
        let mut b = BlobBuilder::new();
        b.begin_node("");
        b.prop("model", b"test\0");
        b.end_node();
        let mut blob = b.finish();
        // shrink size_dt_struct to cut the stream off right after the root's
        // BEGIN_NODE and name
        blob[36..40].copy_from_slice(&8u32.to_be_bytes());

        let fdt = Fdt::from_bytes(&blob).unwrap();
        assert!(matches!(
            fdt.string(NodeOffset::ROOT, "model"),
            Err(FdtError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn property_value_past_block_end_is_rejected() {
        let mut b = BlobBuilder::new();
        b.intern("model");
        b.begin_node("");
        b.prop_header_only(0x100, 0);
        b.end_node();
        let blob = b.finish();

        let fdt = parse(&blob);
        assert!(matches!(
            fdt.string(NodeOffset::ROOT, "model"),
            Err(FdtError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn name_offset_past_strings_block_fails_whole_lookup() {
        let mut b = BlobBuilder::new();
        b.begin_node("");
        b.prop_header_only(0, 0x400);
        b.prop("model", b"test\0");
        b.end_node();
        let blob = b.finish();

        let fdt = parse(&blob);
        // even though "model" exists, the scan cannot get past the property
        // whose name offset lies outside the strings block
        assert!(matches!(
            fdt.string(NodeOffset::ROOT, "model"),
            Err(FdtError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn node_offset_must_point_at_begin_node() {
        let mut b = BlobBuilder::new();
        b.begin_node("");
        b.prop("model", b"test\0");
        b.end_node();
        let blob = b.finish();

        let fdt = parse(&blob);
        // offset 8 lands on the PROP token of the root's first property
        assert!(matches!(
            fdt.node(NodeOffset::from(8)),
            Err(FdtError::BadToken { value: 0x3, .. })
        ));
        // offsets outside the structure block are caught up front
        assert!(matches!(
            fdt.node(NodeOffset::from(0x10_0000)),
            Err(FdtError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn unterminated_string_list_tail_counts_as_entry() {
        let mut b = BlobBuilder::new();
        b.begin_node("");
        b.prop("compatible", b"vendor,a\0vendor,b");
        b.end_node();
        let blob = b.finish();

        let fdt = parse(&blob);
        let list = fdt.string_list(NodeOffset::ROOT, "compatible").unwrap();
        assert_eq!(list.count(), 2);
        assert_eq!(list.collect::<Vec<_>>(), ["vendor,a", "vendor,b"]);
    }
}
