/// Elements with a width, measured in JVM slots
///
/// Locals and operand stack entries are either one slot wide (`int`, `float`, references) or two
/// slots wide (`long`, `double`).
pub trait Width {
    fn width(&self) -> usize;
}
