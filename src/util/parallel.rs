pub use rayon::{current_num_threads, join, scope, Scope};

pub fn num_threads() -> usize {
    current_num_threads()
}

pub fn parallelize_iter<I, T, F>(iter: I, f: F)
where
    I: Send + Iterator<Item = T>,
    T: Send,
    F: Fn(T) + Send + Sync + Clone,
{
    scope(|scope| {
        for item in iter {
            let f = f.clone();
            scope.spawn(move |_| f(item));
        }
    });
}

pub fn parallelize<T, F>(v: &mut [T], f: F)
where
    T: Send,
    F: Fn((&mut [T], usize)) + Send + Sync + Clone,
{
    let num_threads = num_threads();
    let chunk_size = (v.len() + num_threads - 1) / num_threads;
    if chunk_size == 0 {
        return;
    }
    parallelize_iter(
        v.chunks_mut(chunk_size).zip((0..).step_by(chunk_size)),
        move |(chunk, start)| f((chunk, start)),
    );
}
