use crate::{operator::ToolCommand, plan::Plan};
use colored::Colorize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

/// Represents a node in the tree (either file or directory).
#[derive(Debug)]
struct TreeNode {
    name: String,
    children: Vec<Rc<RefCell<TreeNode>>>,
    is_file: bool,
}
impl TreeNode {
    fn new(name: String, is_file: bool) -> Self {
        Self {
            name,
            children: Vec::new(),
            is_file,
        }
    }
}

fn last_component(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Build the image tree from a plan, returning the root node.
///
/// Directories are linked first, parents before children as the plan orders them, then
/// every file is hung under its parent directory.
fn build_tree(plan: &Plan, image: &Path) -> Rc<RefCell<TreeNode>> {
    let root_name = image
        .file_name()
        .map(|os| os.to_string_lossy().to_string())
        .unwrap_or_else(|| image.display().to_string());

    let root = Rc::new(RefCell::new(TreeNode::new(root_name, false)));

    // normalized directory path -> node, the image root is ""
    let mut lookup: HashMap<String, Rc<RefCell<TreeNode>>> = HashMap::new();
    lookup.insert(String::new(), Rc::clone(&root));

    for dir in &plan.directories {
        let parent = dirplan::parent_dir(dir);

        let Some(parent_node) = lookup.get(parent).map(Rc::clone) else {
            log::debug!("parent: {}, not found for directory: {}", parent, dir);
            continue;
        };

        let node = Rc::new(RefCell::new(TreeNode::new(last_component(dir), false)));

        parent_node.borrow_mut().children.push(Rc::clone(&node));

        lookup.insert(dir.clone(), node);
    }

    for entry in &plan.entries {
        let parent = dirplan::normalize_dir(dirplan::parent_dir(&entry.destination));

        let Some(parent_node) = lookup.get(&parent) else {
            log::debug!(
                "parent: {}, not found for file: {}",
                parent,
                entry.destination
            );
            continue;
        };

        let node = TreeNode::new(last_component(&entry.destination), true);

        parent_node
            .borrow_mut()
            .children
            .push(Rc::new(RefCell::new(node)));
    }

    root
}

/// Print the tree with a nice ASCII style.
fn print_tree(node: &Rc<RefCell<TreeNode>>, prefix: &str, is_last: bool) {
    let node_borrow = node.borrow();

    let connector = if is_last {
        "└── ".yellow()
    } else {
        "├── ".yellow()
    };
    let name = if node_borrow.is_file {
        node_borrow.name.green()
    } else {
        node_borrow.name.blue()
    };
    println!("{}{}{}", prefix.yellow(), connector, name);

    let child_prefix = if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };

    let len = node_borrow.children.len();
    for (i, child) in node_borrow.children.iter().enumerate() {
        let last = i == len - 1;
        print_tree(child, &child_prefix, last);
    }
}

/// Prints the image as it will look once the plan has run.
pub fn preview_as_tree(plan: &Plan, image: &Path) {
    let tree_root = build_tree(plan, image);

    println!(
        "Legend: {} = (directory), {} = (file)",
        "blue".blue(),
        "green".green()
    );

    println!("{} {}\n", "┌─".bold().bright_blue(), "Preview".bold().bright_blue());

    print_tree(&tree_root, "", true);

    println!(
        "\n{} {} directories, {} files\n",
        "└─".bold().bright_blue(),
        plan.directories.len(),
        plan.entries.len()
    );
}

/// Prints every tool command a populate run would execute, in order.
pub fn preview_commands(commands: &[ToolCommand], tool: &Path, image: &Path) {
    for command in commands {
        println!(
            "{} {}",
            command.subcommand.as_str().cyan(),
            command.render(tool, image)
        );
    }
}
