//! Implementations of the `Storage` trait that can be used by the runtime.

pub mod faulty;
pub mod file;
pub mod memory;
pub mod metered;

#[cfg(test)]
pub(crate) mod tests {
    use crate::{Blob, Error, Storage};

    /// Runs the full suite of tests on the provided storage implementation.
    pub(crate) fn run_storage_tests<S: Storage>(storage: S) {
        test_open_and_write(&storage);
        test_open_is_fresh(&storage);
        test_large_data(&storage);
        test_overwrite_data(&storage);
        test_read_beyond_bound(&storage);
        test_write_at_large_offset(&storage);
        test_resize_zero_fills(&storage);
        test_resize_truncates(&storage);
        test_sequential_chunk_read_write(&storage);
        test_read_empty_blob(&storage);
        test_overlapping_writes(&storage);
        test_clone_shares_contents(&storage);
        test_sync(&storage);
    }

    /// Test opening a blob, writing to it, and reading back the data.
    fn test_open_and_write<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();
        assert_eq!(blob.len().unwrap(), 0);

        blob.write_at(b"hello world", 0).unwrap();
        let mut buf = vec![0; 11];
        blob.read_at(&mut buf, 0).unwrap();

        assert_eq!(
            buf.as_slice(),
            b"hello world",
            "Blob content does not match expected value"
        );
        assert_eq!(blob.len().unwrap(), 11);
    }

    /// Test that every call to open returns an independent, empty blob.
    fn test_open_is_fresh<S: Storage>(storage: &S) {
        let first = storage.open().unwrap();
        first.write_at(b"first", 0).unwrap();

        let second = storage.open().unwrap();
        assert_eq!(second.len().unwrap(), 0, "New blob should be empty");

        second.write_at(b"other", 0).unwrap();
        let mut buf = vec![0; 5];
        first.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf.as_slice(), b"first", "Blobs should not share contents");
    }

    /// Test handling of large data sizes.
    fn test_large_data<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();

        // Write data larger than a typical page
        let data: Vec<u8> = (0..10 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        blob.write_at(&data, 0).unwrap();

        let mut buf = vec![0; data.len()];
        blob.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf, data, "Large data read does not match written data");
    }

    /// Test overwriting data in a blob.
    fn test_overwrite_data<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();

        // Write initial data
        blob.write_at(b"initial data", 0).unwrap();

        // Overwrite part of the data
        blob.write_at(b"overwrite", 8).unwrap();

        // Read back the data
        let mut buf = vec![0; 17];
        blob.read_at(&mut buf, 0).unwrap();
        assert_eq!(
            buf.as_slice(),
            b"initial overwrite",
            "Data was not overwritten correctly"
        );
    }

    /// Test reading from an offset beyond the length of the blob.
    fn test_read_beyond_bound<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();
        blob.write_at(b"bounded", 0).unwrap();

        // Fully past the end
        let mut buf = vec![0; 4];
        let result = blob.read_at(&mut buf, 8);
        assert!(
            matches!(result, Err(Error::BlobInsufficientLength)),
            "Reading beyond the blob should fail"
        );

        // Straddling the end
        let mut buf = vec![0; 4];
        let result = blob.read_at(&mut buf, 5);
        assert!(
            matches!(result, Err(Error::BlobInsufficientLength)),
            "A short read should fail"
        );
    }

    /// Test writing data at a large offset.
    fn test_write_at_large_offset<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();

        // Write data at a large offset
        blob.write_at(b"offset data", 10_000).unwrap();
        assert_eq!(blob.len().unwrap(), 10_011);

        // Read back the data
        let mut buf = vec![0; 11];
        blob.read_at(&mut buf, 10_000).unwrap();
        assert_eq!(
            buf.as_slice(),
            b"offset data",
            "Data at large offset is incorrect"
        );

        // The gap reads as zeros
        let mut gap = vec![0xff; 100];
        blob.read_at(&mut gap, 5_000).unwrap();
        assert!(gap.iter().all(|b| *b == 0), "Gap should be zero-filled");
    }

    /// Test that extending a blob exposes zeroed bytes.
    fn test_resize_zero_fills<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();
        blob.resize(4096).unwrap();
        assert_eq!(blob.len().unwrap(), 4096);

        let mut buf = vec![0xff; 4096];
        blob.read_at(&mut buf, 0).unwrap();
        assert!(
            buf.iter().all(|b| *b == 0),
            "Resized blob should be zero-filled"
        );
    }

    /// Test that shrinking a blob discards the tail.
    fn test_resize_truncates<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();
        blob.write_at(b"hello world", 0).unwrap();
        blob.resize(5).unwrap();
        assert_eq!(blob.len().unwrap(), 5);

        let mut buf = vec![0; 5];
        blob.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf.as_slice(), b"hello");

        let mut buf = vec![0; 1];
        assert!(matches!(
            blob.read_at(&mut buf, 5),
            Err(Error::BlobInsufficientLength)
        ));

        // Growing again must not resurrect the old bytes
        blob.resize(11).unwrap();
        let mut buf = vec![0xff; 6];
        blob.read_at(&mut buf, 5).unwrap();
        assert_eq!(buf, vec![0; 6]);
    }

    /// Test writing and reading fixed-size chunks, as a block cache would.
    fn test_sequential_chunk_read_write<S: Storage>(storage: &S) {
        const CHUNK: usize = 1024;
        const CHUNKS: usize = 16;

        let blob = storage.open().unwrap();
        blob.resize((CHUNK * CHUNKS) as u64).unwrap();

        // Write chunks out of order
        for i in (0..CHUNKS).rev() {
            let chunk = vec![i as u8; CHUNK];
            blob.write_at(&chunk, (i * CHUNK) as u64).unwrap();
        }

        // Read them back in order
        for i in 0..CHUNKS {
            let mut buf = vec![0; CHUNK];
            blob.read_at(&mut buf, (i * CHUNK) as u64).unwrap();
            assert!(buf.iter().all(|b| *b == i as u8), "Chunk {i} mismatch");
        }
        assert_eq!(blob.len().unwrap(), (CHUNK * CHUNKS) as u64);
    }

    /// Test reading from an empty blob.
    fn test_read_empty_blob<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();

        // A zero-length read always succeeds
        let mut buf = vec![];
        blob.read_at(&mut buf, 0).unwrap();

        let mut buf = vec![0; 1];
        let result = blob.read_at(&mut buf, 0);
        assert!(
            matches!(result, Err(Error::BlobInsufficientLength)),
            "Reading from an empty blob should fail"
        );
    }

    /// Test writing data that overlaps with existing data.
    fn test_overlapping_writes<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();

        // Write initial data
        blob.write_at(b"abcdefghij", 0).unwrap();

        // Write overlapping data
        blob.write_at(b"xyz", 5).unwrap();

        // Read back the data
        let mut buf = vec![0; 10];
        blob.read_at(&mut buf, 0).unwrap();
        assert_eq!(
            buf.as_slice(),
            b"abcdexyzij",
            "Overlapping writes did not produce expected result"
        );
    }

    /// Test that clones of a blob observe each other's writes.
    fn test_clone_shares_contents<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();
        let clone = blob.clone();

        blob.write_at(b"shared", 0).unwrap();
        let mut buf = vec![0; 6];
        clone.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf.as_slice(), b"shared");
    }

    /// Test that sync succeeds on a freshly written blob.
    fn test_sync<S: Storage>(storage: &S) {
        let blob = storage.open().unwrap();
        blob.write_at(b"durable enough", 0).unwrap();
        blob.sync().unwrap();

        let mut buf = vec![0; 14];
        blob.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf.as_slice(), b"durable enough");
    }
}
