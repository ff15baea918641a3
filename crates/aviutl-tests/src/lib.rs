//! Integration test crate for the AviUtl plugin SDK.
//!
//! Plugins are driven through their ABI tables by an in-process mock host
//! that copies tables and owns control arrays the way AviUtl does.


#[cfg(test)]
mod filter;

#[cfg(test)]
mod input;

#[cfg(test)]
mod output;

#[cfg(test)]
mod color;

#[cfg(test)]
mod layout;
