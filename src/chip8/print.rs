//! The pretty print implementation of the [`Machine`](super::Machine), dumping all of its
//! state for debugging. Split up into this file for smaller file sizes and higher cohesion.

use std::fmt::{self, Write};

use num_traits::Unsigned;
use once_cell::sync::Lazy;

use super::Machine;
use crate::{
    definitions::{cpu, memory},
    opcode::Opcode,
};

/// The amount of entries printed per row
/// has to be bigger then 0
const HEX_PRINT_STEP: usize = 8;

const END_OF_LINE: char = '\n';
const INDENT_FILLAMENT: char = '\t';
const INDENT_SIZE: usize = 2;

/// The values that are used when there are at lease two rows of zeros.
const FILLER_BASE: &str = "...";

macro_rules! intformat {
    () => {
        // The formatted string will be 2 sysbols for the prefix (0x)
        // and 4 for the rest long.
        "{:#06X}"
    };
}

macro_rules! pointerformat {
    () => {
        concat!(intformat!(), " - ", intformat!(), " :")
    };
}

static INTEGER_LEN: Lazy<usize> = Lazy::new(|| format!(intformat!(), 0u8).len());

static POINTER_LEN: Lazy<usize> = Lazy::new(|| format!(pointerformat!(), 0, 0).len());

/// a line length (This is a bit bigger then the actual line will be)
static LENLINE: Lazy<usize> =
    Lazy::new(|| INDENT_SIZE + *POINTER_LEN + HEX_PRINT_STEP * (*INTEGER_LEN + 1) + 1);

/// Prepares the row that will be used, in the case that there is at least one row of only zeros.
static ZERO_FILLER: Lazy<String> = Lazy::new(|| {
    let formatted = format!(intformat!(), 0u16);
    let length =
        formatted.len() * (HEX_PRINT_STEP - 2) + (HEX_PRINT_STEP - 1) - FILLER_BASE.len();
    let filler = " ".repeat(length / 2);
    format!("{0}{1}{2}{1}{0}", formatted, filler, FILLER_BASE)
});

/// Will add an indent
fn indent_helper(text: &mut String, indent: usize) {
    for _ in 0..indent {
        text.push(INDENT_FILLAMENT);
    }
}

/// will format the pointers according to definition
fn pointer_formatter(line: &mut String, from: usize, to: usize) -> fmt::Result {
    write!(line, pointerformat!(), from, to)
}

/// will format all integer types
fn integer_formatter<T>(line: &mut String, data: T) -> fmt::Result
where
    T: fmt::UpperHex + Unsigned + Copy,
{
    write!(line, intformat!(), data)
}

/// keeps the booleans as wide as the integers
fn bool_formatter(line: &mut String, data: bool) -> fmt::Result {
    let message = if data { "true" } else { "false" };
    write!(line, "{:<width$}", message, width = *INTEGER_LEN)
}

/// will pretty print the data given in rows of `HEX_PRINT_STEP` entries,
/// the offsets are calculated from the beginning of the data
fn printer<T, F>(data: &[T], indent: usize, formatter: F) -> Result<String, fmt::Error>
where
    T: Copy,
    F: Fn(&mut String, T) -> fmt::Result,
{
    let mut res = String::with_capacity(*LENLINE * (data.len() / HEX_PRINT_STEP + 1));

    for (row, chunk) in data.chunks(HEX_PRINT_STEP).enumerate() {
        let from = row * HEX_PRINT_STEP;

        let mut line = String::with_capacity(*LENLINE);
        indent_helper(&mut line, indent);
        pointer_formatter(&mut line, from, from + chunk.len() - 1)?;

        for entry in chunk {
            line.push(' ');
            formatter(&mut line, *entry)?;
        }

        res.push_str(line.trim_end());
        res.push(END_OF_LINE);
    }

    // Remove unneded new line
    if res.ends_with(END_OF_LINE) {
        res.pop();
    }
    Ok(res)
}

/// this struct will simulate a single row of opcodes (only in this context)
struct Row {
    from: usize,
    to: usize,
    data: [Opcode; HEX_PRINT_STEP],
    only_null: bool,
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = String::with_capacity(*LENLINE);
        pointer_formatter(&mut res, self.from, self.to)?;
        res.push(' ');

        if self.only_null {
            res.push_str(&ZERO_FILLER);
        } else {
            for (i, entry) in self.data.iter().enumerate() {
                if i > 0 {
                    res.push(' ');
                }
                integer_formatter(&mut res, *entry)?;
            }
        }
        write!(f, "{}", res)
    }
}

/// will pretty print the content of the raw memory as opcodes,
/// consecutive rows of zeros are folded into a single one
fn memory_printer(data: &[u8], indent: usize) -> Result<String, fmt::Error> {
    /// The amount of bytes per row, as a single opcode is two bytes long
    const POINTER_INCREMENT: usize = HEX_PRINT_STEP * memory::opcodes::SIZE;

    let mut rows: Vec<Row> = Vec::with_capacity(data.len() / POINTER_INCREMENT);

    for (index, chunk) in data.chunks(POINTER_INCREMENT).enumerate() {
        let from = index * POINTER_INCREMENT;
        let mut row = Row {
            from,
            to: from + chunk.len() - 1,
            data: [0; HEX_PRINT_STEP],
            only_null: chunk.iter().all(|&byte| byte == 0),
        };

        for (opcode, pair) in row.data.iter_mut().zip(chunk.chunks_exact(2)) {
            *opcode = Opcode::from_be_bytes([pair[0], pair[1]]);
        }

        if row.only_null {
            if let Some(last_row) = rows.last() {
                if last_row.only_null {
                    row.from = last_row.from;
                    rows.pop();
                }
            }
        }
        rows.push(row);
    }

    let mut string = String::with_capacity((*LENLINE + 1) * rows.len());
    for row in rows {
        indent_helper(&mut string, indent);
        write!(string, "{}{}", row, END_OF_LINE)?;
    }
    if string.ends_with(END_OF_LINE) {
        string.pop();
    }
    Ok(string)
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nam = String::with_capacity(INDENT_SIZE + self.name.len());
        indent_helper(&mut nam, INDENT_SIZE);
        nam.push_str(&self.name);

        let scalars: [(&str, u16); 6] = [
            ("Opcode", self.opcode),
            ("Program Counter", self.program_counter),
            ("Index Register", self.index_register),
            ("Stack Pointer", self.stack.len() as u16),
            ("Delay Timer", self.delay_timer.into()),
            ("Sound Timer", self.sound_timer.into()),
        ];
        let mut sca = String::with_capacity(scalars.len() * *LENLINE);
        for (title, value) in scalars.iter() {
            write!(sca, "\t{} :{}", title, END_OF_LINE)?;
            indent_helper(&mut sca, INDENT_SIZE);
            integer_formatter(&mut sca, *value)?;
            sca.push(END_OF_LINE);
        }

        let mem = memory_printer(&self.memory, INDENT_SIZE)?;
        let key = printer(self.keyboard.get_keys(), INDENT_SIZE, bool_formatter)?;

        // handle stack specially as it needes to be filled up if empty
        let mut stack = [0u16; cpu::stack::SIZE];
        stack[..self.stack.len()].copy_from_slice(&self.stack);
        let sta = printer(&stack, INDENT_SIZE, integer_formatter)?;

        let reg = printer(&self.registers, INDENT_SIZE, integer_formatter)?;

        write!(
            f,
            "Machine {{\n\
                \tProgram Name :\n{}\n\
                {}\
                \tMemory :\n{}\n\
                \tKeyboard :\n{}\n\
                \tStack :\n{}\n\
                \tRegister :\n{}\n\
                }}",
            nam, sca, mem, key, sta, reg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{super::tests, *};
    use crate::definitions::keyboard;

    const OUTPUT_PRINT: &str = "\
        Machine {\n\
            \tProgram Name :\n\
                \t\tADD\n\
            \tOpcode :\n\
                \t\t0x0000\n\
            \tProgram Counter :\n\
                \t\t0x0200\n\
            \tIndex Register :\n\
                \t\t0x0000\n\
            \tStack Pointer :\n\
                \t\t0x0000\n\
            \tDelay Timer :\n\
                \t\t0x0000\n\
            \tSound Timer :\n\
                \t\t0x0000\n\
            \tMemory :\n\
                \t\t0x0000 - 0x000F : 0xF090 0x9090 0xF020 0x6020 0x2070 0xF010 0xF080 0xF0F0\n\
                \t\t0x0010 - 0x001F : 0x10F0 0x10F0 0x9090 0xF010 0x10F0 0x80F0 0x10F0 0xF080\n\
                \t\t0x0020 - 0x002F : 0xF090 0xF0F0 0x1020 0x4040 0xF090 0xF090 0xF0F0 0x90F0\n\
                \t\t0x0030 - 0x003F : 0x10F0 0xF090 0xF090 0x90E0 0x90E0 0x90E0 0xF080 0x8080\n\
                \t\t0x0040 - 0x004F : 0xF0E0 0x9090 0x90E0 0xF080 0xF080 0xF0F0 0x80F0 0x8080\n\
                \t\t0x0050 - 0x01FF : 0x0000                    ...                    0x0000\n\
                \t\t0x0200 - 0x020F : 0x6005 0x6105 0x8014 0x0000 0x0000 0x0000 0x0000 0x0000\n\
                \t\t0x0210 - 0x0FFF : 0x0000                    ...                    0x0000\n\
            \tKeyboard :\n\
                \t\t0x0000 - 0x0007 : false  true   false  true   false  true   false  true\n\
                \t\t0x0008 - 0x000F : false  true   false  true   false  true   false  true\n\
            \tStack :\n\
                \t\t0x0000 - 0x0007 : 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000\n\
                \t\t0x0008 - 0x000F : 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000\n\
            \tRegister :\n\
                \t\t0x0000 - 0x0007 : 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000\n\
                \t\t0x0008 - 0x000F : 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000\n\
        }";

    #[test]
    /// tests if the pretty print output is as expected
    fn test_full_print() {
        let mut chip = tests::get_loaded_chip("ADD", &tests::ADD_PROGRAM);

        let mut keys = [false; keyboard::SIZE];
        for (index, key) in keys.iter_mut().enumerate() {
            *key = index % 2 != 0;
        }
        chip.set_keyboard(&keys);

        let actual_full = format!("{}", chip);

        for (exp, act) in OUTPUT_PRINT.split('\n').zip(actual_full.split('\n')) {
            assert_eq!(exp, act);
        }
        assert_eq!(OUTPUT_PRINT, actual_full);
    }

    #[test]
    fn test_stack_entries_are_printed() {
        let mut chip = tests::get_default_chip();
        chip.stack.push(0x0204);
        chip.stack.push(0x0A16);

        let printed = format!("{}", chip);
        assert!(printed.contains(
            "\t\t0x0000 - 0x0007 : 0x0204 0x0A16 0x0000 0x0000 0x0000 0x0000 0x0000 0x0000"
        ));
        assert!(printed.contains("\tStack Pointer :\n\t\t0x0002\n"));
    }

    #[test]
    fn test_zero_filler_width() {
        // the filler takes up exactly as much space as a row of integers
        let full_row = printer(&[0u16; HEX_PRINT_STEP], 0, integer_formatter).unwrap();
        assert_eq!(full_row.len(), *POINTER_LEN + 1 + ZERO_FILLER.len());
    }
}
