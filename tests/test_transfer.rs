use chunkwalk::{
    read_slice, read_slice_as, slice_chunk_indices, write_slice, write_slice_as, ElementType,
    Endianness, Hyperslab, MemoryChunkStore, TransferSummary, VarDesc, WalkConfig,
};
use ctor::ctor;
use quickcheck::{quickcheck, TestResult};
use tracing_subscriber::EnvFilter;

#[ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn store_for(var: &VarDesc) -> MemoryChunkStore {
    MemoryChunkStore::new(chunkwalk::chunk_nbytes(var).unwrap())
}

/// Linear positions, in a dense row-major array of shape `dims`, of the
/// elements a hyperslab selects, in selection order.
fn dense_positions(dims: &[u64], hs: &Hyperslab) -> Vec<usize> {
    let mut positions = vec![0usize];
    for (d, &dim_len) in dims.iter().enumerate() {
        let mut next = Vec::new();
        for &base in &positions {
            for k in 0..hs.count[d] {
                let index = hs.start[d] + k * hs.stride[d];
                next.push(base * dim_len as usize + index as usize);
            }
        }
        positions = next;
    }
    positions
}

/// Write the linear index of every element of `var`.
fn write_linear(store: &mut MemoryChunkStore, var: &VarDesc) {
    let n: u64 = var.dim_lens.iter().product();
    let data: Vec<u32> = (0..n as u32).collect();
    write_slice_as(store, var, WalkConfig::default(), &Hyperslab::all(var), &data).unwrap();
}

fn round_trip(var: &VarDesc, hs: &Hyperslab, config: WalkConfig) -> TransferSummary {
    let n = hs.num_elements().unwrap() as u32;
    let data: Vec<u32> = (0..n).map(|i| i * 7 + 3).collect();
    let mut store = store_for(var);
    write_slice_as(&mut store, var, config, hs, &data).unwrap();
    let mut out = vec![0u32; n as usize];
    let summary = read_slice_as(&mut store, var, config, hs, &mut out).unwrap();
    assert_eq!(out, data);
    summary
}

#[test]
fn round_trip_whole_single_chunk_dimension() {
    let var = VarDesc::new(vec![4], vec![4], ElementType::UInt);
    let hs = Hyperslab::all(&var);
    let summary = round_trip(&var, &hs, WalkConfig::default());
    assert!(summary.whole_chunk);
    assert_eq!(summary.chunks_visited, 1);
    assert_eq!(summary.elements, 4);

    let summary = round_trip(&var, &hs, WalkConfig::disabled());
    assert!(!summary.whole_chunk);
    assert_eq!(summary.elements, 4);
}

#[test]
fn round_trip_stride_two_across_three_chunks() {
    let var = VarDesc::new(vec![10], vec![4], ElementType::UInt);
    let hs = Hyperslab::new(vec![0], vec![5], vec![2]);
    let summary = round_trip(&var, &hs, WalkConfig::default());
    assert_eq!(summary.chunks_visited, 3);
    assert_eq!(summary.chunks_created, 0);
    assert_eq!(summary.elements, 5);
}

#[test]
fn round_trip_mid_chunk_3d() {
    let var = VarDesc::new(vec![7, 9, 5], vec![3, 4, 2], ElementType::UInt);
    let hs = Hyperslab::contiguous(vec![1, 2, 1], vec![5, 6, 3]);
    for config in [WalkConfig::default(), WalkConfig::disabled()] {
        let summary = round_trip(&var, &hs, config);
        // Chunk ranges: [0, 2), [0, 2), [0, 2).
        assert_eq!(summary.chunks_visited, 8);
        assert_eq!(summary.elements, 90);
    }
}

#[test]
fn write_lands_in_chunk_layout() {
    let var = VarDesc::new(vec![10], vec![4], ElementType::UInt);
    let mut store = store_for(&var);
    let hs = Hyperslab::new(vec![2], vec![4], vec![2]);
    let summary = write_slice_as(
        &mut store,
        &var,
        WalkConfig::default(),
        &hs,
        &[10u32, 11, 12, 13],
    )
    .unwrap();
    assert_eq!(summary.chunks_created, 3);
    assert_eq!(store.keys(), vec!["0", "1", "2"]);

    let chunk: Vec<u32> = bytemuck::allocation::pod_collect_to_vec(store.get(&[1]).unwrap());
    assert_eq!(chunk, vec![11, 0, 12, 0]);
    let chunk: Vec<u32> = bytemuck::allocation::pod_collect_to_vec(store.get(&[2]).unwrap());
    assert_eq!(chunk, vec![13, 0, 0, 0]);
}

#[test]
fn strided_reads_match_dense_model() {
    let var = VarDesc::new(vec![7, 9, 5], vec![3, 4, 2], ElementType::UInt);
    let mut store = store_for(&var);
    write_linear(&mut store, &var);

    let cases = [
        Hyperslab::new(vec![0, 0, 0], vec![4, 3, 3], vec![2, 3, 2]),
        Hyperslab::new(vec![1, 8, 4], vec![2, 1, 1], vec![5, 1, 1]),
        Hyperslab::new(vec![6, 1, 0], vec![1, 2, 5], vec![1, 7, 1]),
        Hyperslab::all(&var),
    ];
    for hs in &cases {
        let expected: Vec<u32> = dense_positions(&var.dim_lens, hs)
            .into_iter()
            .map(|p| p as u32)
            .collect();
        for config in [WalkConfig::default(), WalkConfig::disabled()] {
            let mut out = vec![0u32; expected.len()];
            read_slice_as(&mut store, &var, config, hs, &mut out).unwrap();
            assert_eq!(out, expected, "{hs:?} {config:?}");
        }
    }
}

#[test]
fn optimizations_do_not_change_results() {
    fn prop(
        dims: (u8, u8),
        chunks: (u8, u8),
        start: (u8, u8),
        count: (u8, u8),
        stride: (u8, u8),
    ) -> TestResult {
        let dim_lens = vec![u64::from(dims.0 % 9) + 1, u64::from(dims.1 % 9) + 1];
        let chunk_lens = vec![u64::from(chunks.0 % 4) + 1, u64::from(chunks.1 % 4) + 1];
        let var = VarDesc::new(dim_lens.clone(), chunk_lens, ElementType::UInt);

        let start = vec![u64::from(start.0) % dim_lens[0], u64::from(start.1) % dim_lens[1]];
        let stride = vec![u64::from(stride.0 % 3) + 1, u64::from(stride.1 % 3) + 1];
        let max = |d: usize| (dim_lens[d] - 1 - start[d]) / stride[d] + 1;
        let count = vec![u64::from(count.0) % (max(0) + 1), u64::from(count.1) % (max(1) + 1)];
        let hs = Hyperslab::new(start, count, stride);

        let mut store = store_for(&var);
        write_linear(&mut store, &var);
        let expected: Vec<u32> = dense_positions(&var.dim_lens, &hs)
            .into_iter()
            .map(|p| p as u32)
            .collect();

        let mut fast = vec![0u32; expected.len()];
        let mut slow = vec![0u32; expected.len()];
        let a = read_slice_as(&mut store, &var, WalkConfig::default(), &hs, &mut fast).unwrap();
        let b = read_slice_as(&mut store, &var, WalkConfig::disabled(), &hs, &mut slow).unwrap();
        TestResult::from_bool(fast == expected && slow == expected && a.elements == b.elements)
    }
    quickcheck(prop as fn((u8, u8), (u8, u8), (u8, u8), (u8, u8), (u8, u8)) -> TestResult);
}

#[test]
fn unwritten_region_reads_fill_value() {
    let var = VarDesc::new(vec![6, 6], vec![4, 4], ElementType::Int)
        .with_fill_value((-1i32).to_ne_bytes());
    let mut store = store_for(&var);
    let mut out = vec![0i32; 36];
    let summary = read_slice_as(
        &mut store,
        &var,
        WalkConfig::default(),
        &Hyperslab::all(&var),
        &mut out,
    )
    .unwrap();
    assert!(out.iter().all(|&v| v == -1));
    assert_eq!(summary.chunks_created, 4);
}

#[test]
fn unwritten_region_without_fill_reads_zero() {
    let var = VarDesc::new(vec![5], vec![2], ElementType::Short);
    let mut store = store_for(&var);
    let mut out = vec![9i16; 3];
    read_slice_as(
        &mut store,
        &var,
        WalkConfig::default(),
        &Hyperslab::new(vec![0], vec![3], vec![2]),
        &mut out,
    )
    .unwrap();
    assert_eq!(out, vec![0, 0, 0]);
}

#[test]
fn partial_write_keeps_fill_elsewhere() {
    let var = VarDesc::new(vec![8], vec![4], ElementType::UByte).with_fill_value(vec![0xEE]);
    let mut store = store_for(&var);
    write_slice(
        &mut store,
        &var,
        WalkConfig::default(),
        &Hyperslab::contiguous(vec![3], vec![2]),
        &[1, 2],
    )
    .unwrap();

    let mut out = vec![0u8; 8];
    let summary = read_slice(
        &mut store,
        &var,
        WalkConfig::default(),
        &Hyperslab::all(&var),
        &mut out,
    )
    .unwrap();
    assert_eq!(out, vec![0xEE, 0xEE, 0xEE, 1, 2, 0xEE, 0xEE, 0xEE]);
    assert_eq!(summary.chunks_created, 0);
}

#[test]
fn swapped_storage_round_trips() {
    let var = VarDesc::new(vec![6], vec![4], ElementType::UInt)
        .with_endianness(Endianness::Big, Endianness::Little);
    let mut store = store_for(&var);
    let values = [0x0102_0304u32, 0xA0B0_C0D0, 7, 8, 9, 10];
    write_slice_as(&mut store, &var, WalkConfig::default(), &Hyperslab::all(&var), &values)
        .unwrap();

    let stored: Vec<u32> = bytemuck::allocation::pod_collect_to_vec(store.get(&[0]).unwrap());
    let swapped: Vec<u32> = values[..4].iter().map(|v| v.swap_bytes()).collect();
    assert_eq!(stored, swapped);

    let mut out = [0u32; 6];
    read_slice_as(&mut store, &var, WalkConfig::default(), &Hyperslab::all(&var), &mut out)
        .unwrap();
    assert_eq!(out, values);
}

#[test]
fn swapped_eight_byte_elements_and_fill() {
    let fill = 2.5f64;
    let var = VarDesc::new(vec![3, 3], vec![2, 2], ElementType::Double)
        .with_swap(true)
        .with_fill_value(fill.to_ne_bytes());
    let mut store = store_for(&var);
    write_slice_as(
        &mut store,
        &var,
        WalkConfig::default(),
        &Hyperslab::contiguous(vec![0, 0], vec![1, 3]),
        &[1.0f64, -2.0, 3.25],
    )
    .unwrap();

    let stored: Vec<u64> = bytemuck::allocation::pod_collect_to_vec(store.get(&[0, 0]).unwrap());
    assert_eq!(stored[0], 1.0f64.to_bits().swap_bytes());
    assert_eq!(stored[2], fill.to_bits().swap_bytes());

    let mut out = [0f64; 9];
    read_slice_as(&mut store, &var, WalkConfig::disabled(), &Hyperslab::all(&var), &mut out)
        .unwrap();
    assert_eq!(out, [1.0, -2.0, 3.25, fill, fill, fill, fill, fill, fill]);
}

#[test]
fn opaque_elements_are_not_swapped() {
    let var = VarDesc::new(vec![2], vec![2], ElementType::Opaque(3))
        .with_swap(true)
        .with_fill_value(vec![7, 8, 9]);
    let mut store = store_for(&var);
    let data = [1u8, 2, 3, 4, 5, 6];
    write_slice(&mut store, &var, WalkConfig::disabled(), &Hyperslab::all(&var), &data).unwrap();
    assert_eq!(store.get(&[0]).unwrap(), &data[..]);

    let mut out = [0u8; 6];
    read_slice(&mut store, &var, WalkConfig::disabled(), &Hyperslab::all(&var), &mut out).unwrap();
    assert_eq!(out, data);

    let fresh = VarDesc::new(vec![4], vec![2], ElementType::Opaque(3))
        .with_swap(true)
        .with_fill_value(vec![7, 8, 9]);
    let mut store = store_for(&fresh);
    let mut out = [0u8; 3];
    read_slice(
        &mut store,
        &fresh,
        WalkConfig::default(),
        &Hyperslab::contiguous(vec![2], vec![1]),
        &mut out,
    )
    .unwrap();
    assert_eq!(out, [7, 8, 9]);
    assert_eq!(store.get(&[1]).unwrap(), &[7, 8, 9, 7, 8, 9][..]);
}

#[test]
fn scalar_variable() {
    let var = VarDesc::scalar(ElementType::Double);
    let mut store = store_for(&var);
    let summary = write_slice_as(
        &mut store,
        &var,
        WalkConfig::default(),
        &Hyperslab::scalar(),
        &[3.5f64],
    )
    .unwrap();
    assert_eq!(summary.elements, 1);
    assert_eq!(store.keys(), vec!["0"]);

    let mut out = [0f64];
    read_slice_as(&mut store, &var, WalkConfig::default(), &Hyperslab::scalar(), &mut out)
        .unwrap();
    assert_eq!(out, [3.5]);
}

#[test]
fn empty_request_fetches_nothing() {
    let var = VarDesc::new(vec![10, 10], vec![4, 4], ElementType::Int);
    let mut store = store_for(&var);
    let mut out: [i32; 0] = [];
    let summary = read_slice_as(
        &mut store,
        &var,
        WalkConfig::default(),
        &Hyperslab::contiguous(vec![2, 2], vec![3, 0]),
        &mut out,
    )
    .unwrap();
    assert_eq!(summary, TransferSummary::default());
    assert_eq!(store.fetches(), 0);
}

#[test]
fn skipped_chunks_are_not_fetched() {
    let var = VarDesc::new(vec![10, 10], vec![4, 4], ElementType::UByte);
    let hs = Hyperslab::new(vec![1, 1], vec![3, 2], vec![4, 8]);
    let chunks = slice_chunk_indices(&var, &hs).unwrap();
    assert_eq!(
        chunks,
        vec![
            vec![0, 0],
            vec![0, 2],
            vec![1, 0],
            vec![1, 2],
            vec![2, 0],
            vec![2, 2]
        ]
    );

    let mut store = store_for(&var);
    let mut out = vec![0u8; 6];
    let summary = read_slice(&mut store, &var, WalkConfig::default(), &hs, &mut out).unwrap();
    assert_eq!(summary.chunks_visited, 6);
    // Chunk 1 of dimension 1 is stepped over.
    assert_eq!(summary.chunks_skipped, 3);
    assert_eq!(store.fetches(), 6);
    assert!(store.get(&[0, 1]).is_none());
}
