//! Row-wise traversal of owned buffers, parallel when the `parallel` feature
//! is enabled.
use super::ImageF32;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Run `f(index, chunk)` over consecutive `chunk_len`-sized chunks of `data`.
pub(crate) fn for_each_chunk<T, F>(data: &mut [T], chunk_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if chunk_len == 0 {
        return;
    }
    #[cfg(feature = "parallel")]
    {
        data.par_chunks_mut(chunk_len)
            .enumerate()
            .for_each(|(i, chunk)| f(i, chunk));
    }
    #[cfg(not(feature = "parallel"))]
    {
        data.chunks_mut(chunk_len)
            .enumerate()
            .for_each(|(i, chunk)| f(i, chunk));
    }
}

/// Run `f(y, row)` over every row of `dst`.
pub(crate) fn for_each_row<F>(dst: &mut ImageF32, f: F)
where
    F: Fn(usize, &mut [f32]) + Sync + Send,
{
    let w = dst.w;
    for_each_chunk(&mut dst.data, w, f);
}
