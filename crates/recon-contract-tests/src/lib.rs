#![forbid(unsafe_code)]


#[cfg(test)]
mod compositor;

#[cfg(test)]
mod determinism;
