//! CLI entry point for the `rv32i` simulator binary.

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process;

use rv32i_core::{disassemble_image, Memory, SingleHartCpu};
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: rv32i [-d] [-i] [-r] [-z] [-l exec-limit] [-m hex-mem-size] infile
    -d show disassembly before program execution
    -i show instruction printing during execution
    -l maximum number of instructions to exec
    -m specify memory size (default = 0x100)
    -r show register printing during execution
    -z show a dump of the regs & memory after simulation";

const DEFAULT_MEMORY_SIZE: u32 = 0x100;

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    disassemble: bool,
    show_instructions: bool,
    show_registers: bool,
    post_dump: bool,
    exec_limit: u64,
    memory_size: u32,
    infile: String,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<CliArgs, String> {
    let mut disassemble = false;
    let mut show_instructions = false;
    let mut show_registers = false;
    let mut post_dump = false;
    let mut exec_limit = 0_u64;
    let mut memory_size = DEFAULT_MEMORY_SIZE;
    let mut infile: Option<String> = None;

    while let Some(arg) = args.next() {
        let arg = arg.to_string_lossy().into_owned();

        let Some(flags) = arg.strip_prefix('-') else {
            if infile.is_some() {
                return Err(String::from("multiple input files provided"));
            }
            infile = Some(arg);
            continue;
        };
        if flags.is_empty() {
            return Err(String::from("missing option letter after '-'"));
        }

        // Combined flags and attached option values, getopt style: -di,
        // -l5, -m 100 are all accepted.
        let letters: Vec<char> = flags.chars().collect();
        let mut pos = 0;
        while pos < letters.len() {
            match letters[pos] {
                'd' => disassemble = true,
                'i' => show_instructions = true,
                'r' => show_registers = true,
                'z' => post_dump = true,
                letter @ ('l' | 'm') => {
                    let attached: String = letters[pos + 1..].iter().collect();
                    let value = if attached.is_empty() {
                        args.next()
                            .map(|v| v.to_string_lossy().into_owned())
                            .ok_or_else(|| format!("option requires an argument -- '{letter}'"))?
                    } else {
                        attached
                    };
                    if letter == 'l' {
                        exec_limit = value
                            .parse()
                            .map_err(|_| format!("invalid exec-limit '{value}'"))?;
                    } else {
                        let digits = value
                            .strip_prefix("0x")
                            .or_else(|| value.strip_prefix("0X"))
                            .unwrap_or(&value);
                        memory_size = u32::from_str_radix(digits, 16)
                            .map_err(|_| format!("invalid memory size '{value}'"))?;
                    }
                    pos = letters.len();
                    continue;
                }
                other => return Err(format!("invalid option -- '{other}'")),
            }
            pos += 1;
        }
    }

    let infile = infile.ok_or_else(|| String::from("missing input file"))?;
    Ok(CliArgs {
        disassemble,
        show_instructions,
        show_registers,
        post_dump,
        exec_limit,
        memory_size,
        infile,
    })
}

fn usage() -> ! {
    eprintln!("{USAGE_TEXT}");
    process::exit(1);
}

fn main() {
    let args = match parse_args(env::args_os().skip(1)) {
        Ok(args) => args,
        Err(error) => {
            eprintln!("rv32i: {error}");
            usage();
        }
    };

    let mut mem = Memory::new(args.memory_size);
    if let Err(error) = mem.load_image(&args.infile) {
        eprintln!("{error}");
        usage();
    }

    let mut cpu = SingleHartCpu::new(mem);

    if args.disassemble {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for row in disassemble_image(cpu.memory()) {
            let _ = writeln!(out, "{row}");
        }
        cpu.reset();
    }

    if args.show_instructions {
        cpu.reset();
        if args.show_registers {
            let stdout = io::stdout();
            let _ = cpu.dump("", &mut stdout.lock());
            cpu.hart_mut().set_show_registers(true);
        }
        cpu.hart_mut().set_show_instructions(true);
    }

    cpu.run(args.exec_limit);

    if args.post_dump {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let _ = cpu.dump("", &mut out);
        let _ = cpu.memory().dump(&mut out);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_args, CliArgs};
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        parse_args(args.iter().map(OsString::from))
    }

    #[test]
    fn parses_input_only_with_defaults() {
        let args = parse(&["image.bin"]).expect("input-only args should parse");
        assert_eq!(
            args,
            CliArgs {
                disassemble: false,
                show_instructions: false,
                show_registers: false,
                post_dump: false,
                exec_limit: 0,
                memory_size: 0x100,
                infile: String::from("image.bin"),
            }
        );
    }

    #[test]
    fn parses_separate_flags_in_any_order() {
        let args = parse(&["-d", "image.bin", "-z"]).expect("flags should parse");
        assert!(args.disassemble);
        assert!(args.post_dump);
        assert_eq!(args.infile, "image.bin");
    }

    #[test]
    fn parses_combined_flags() {
        let args = parse(&["-dir", "image.bin"]).expect("combined flags should parse");
        assert!(args.disassemble);
        assert!(args.show_instructions);
        assert!(args.show_registers);
    }

    #[test]
    fn parses_option_values_separate_and_attached() {
        let separate = parse(&["-m", "200", "-l", "42", "image.bin"]).expect("separate values");
        assert_eq!(separate.memory_size, 0x200);
        assert_eq!(separate.exec_limit, 42);

        let attached = parse(&["-m0x200", "-l42", "image.bin"]).expect("attached values");
        assert_eq!(attached.memory_size, 0x200);
        assert_eq!(attached.exec_limit, 42);
    }

    #[test]
    fn memory_size_is_hexadecimal() {
        let args = parse(&["-m", "ff", "image.bin"]).expect("hex size");
        assert_eq!(args.memory_size, 0xFF);
    }

    #[test]
    fn rejects_missing_input() {
        let error = parse(&["-d"]).expect_err("missing file should fail");
        assert!(error.contains("missing input file"));
    }

    #[test]
    fn rejects_unknown_flags() {
        let error = parse(&["-q", "image.bin"]).expect_err("unknown flag should fail");
        assert!(error.contains("invalid option"));
    }

    #[test]
    fn rejects_missing_option_values() {
        let error = parse(&["image.bin", "-l"]).expect_err("dangling -l should fail");
        assert!(error.contains("requires an argument"));
    }

    #[test]
    fn rejects_garbage_option_values() {
        assert!(parse(&["-l", "ten", "image.bin"]).is_err());
        assert!(parse(&["-m", "zz", "image.bin"]).is_err());
    }
}
