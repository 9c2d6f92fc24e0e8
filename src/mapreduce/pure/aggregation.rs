//! Pure functions for assembling reduce output
//!
//! A partition's output blob is one line per key, `"{key} {result}"`, in
//! ascending key order. The order depends only on the keys, never on the
//! order map tasks finished in.

use std::collections::HashMap;

/// Keys of a partition in ascending lexicographic order
pub fn sorted_keys(partition: &HashMap<String, Vec<String>>) -> Vec<&str> {
    let mut keys: Vec<&str> = partition.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// Format one output line
pub fn format_output_line(key: &str, result: &str) -> String {
    format!("{key} {result}")
}

/// Run `reduce` over every key of a partition and join the lines
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use mapreduce_engine::mapreduce::pure::aggregation::assemble_partition_output;
///
/// let mut partition = HashMap::new();
/// partition.insert("b".to_string(), vec!["1".to_string()]);
/// partition.insert("a".to_string(), vec!["1".to_string(), "1".to_string()]);
///
/// let blob = assemble_partition_output(&partition, |_, values| values.len().to_string());
/// assert_eq!(blob, "a 2\nb 1");
/// ```
pub fn assemble_partition_output<F>(partition: &HashMap<String, Vec<String>>, reduce: F) -> String
where
    F: Fn(&str, &[String]) -> String,
{
    sorted_keys(partition)
        .into_iter()
        .map(|key| format_output_line(key, &reduce(key, &partition[key])))
        .collect::<Vec<_>>()
        .join("\n")
}
