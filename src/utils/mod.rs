pub mod password;
#[cfg(test)]
pub mod test_utils;
pub mod url;
